//! jobqueue - in-process async job scheduler
//!
//! Callers submit units of async work; the [`Scheduler`] runs them subject to three
//! independent limits:
//!
//! - **Concurrency**: at most `concurrency-limit` jobs execute at once
//! - **Rate**: at most `rate-limit` jobs start per trailing window (60s by default)
//! - **Timeout**: each job must settle within `timeout-limit-secs` of its start
//!
//! Jobs start strictly in submission order. [`Scheduler::dispose`] fails every job
//! still waiting and refuses new work, while jobs already running finish on their own.
//!
//! # Modules
//!
//! - [`scheduler`] - the scheduler, its configuration and result types
//! - [`workload`] - simulated jobs for exercising a scheduler
//! - [`config`] - configuration file loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod scheduler;
pub mod workload;

// Re-export commonly used types
pub use config::Config;
pub use scheduler::{JobError, JobHandle, JobResult, QueueState, Scheduler, SchedulerConfig, SchedulerStats};
pub use workload::{JobReport, JobStatus, WorkloadConfig, WorkloadReport, run_workload};
