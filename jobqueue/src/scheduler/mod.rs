//! Scheduler for throttled job execution
//!
//! Runs submitted jobs in FIFO order under a concurrency limit, a trailing-window
//! rate limit and a per-job timeout, all in a single component.

mod config;
mod core;
mod error;
mod handle;
mod queue;
mod window;

pub use config::SchedulerConfig;
pub use core::Scheduler;
pub use error::JobError;
pub use handle::JobHandle;
pub use queue::{JobResult, QueueState, SchedulerStats};
