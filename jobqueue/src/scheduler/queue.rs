//! Queue types for the scheduler

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;
use uuid::Uuid;

use super::error::JobError;

/// Value produced by a successful job, with its timings
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult<T> {
    /// What the work returned
    pub result: T,

    /// Time between submission and dispatch
    pub queue_time: Duration,

    /// Time between dispatch and settlement
    pub execution_time: Duration,
}

impl<T> JobResult<T> {
    pub fn queue_time_ms(&self) -> u64 {
        self.queue_time.as_millis() as u64
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time.as_millis() as u64
    }
}

/// Statistics for the scheduler
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub total_submitted: u64,
    pub total_started: u64,
    pub total_succeeded: u64,
    pub total_failed: u64,
    pub total_timed_out: u64,
    pub total_abandoned: u64,
    pub total_disposed: u64,
    pub total_rate_limited: u64,
    pub total_queue_time_ms: u64,
    pub peak_queue_depth: usize,
    pub peak_concurrent: usize,
}

/// Point-in-time view of the scheduler
#[derive(Debug, Clone, Serialize)]
pub struct QueueState {
    pub running: usize,
    pub queued: usize,
    /// A rate re-check is pending because the window is full
    pub rate_limited: bool,
    pub disposed: bool,
    pub stats: SchedulerStats,
}

/// How a dispatched job ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
    Abandoned,
}

/// Outcome of a finished job plus the deferred delivery to its caller
pub(crate) struct Settlement {
    pub(crate) outcome: JobOutcome,
    deliver: Box<dyn FnOnce() + Send>,
}

impl Settlement {
    /// Hand the result to whoever holds the JobHandle
    pub(crate) fn deliver(self) {
        (self.deliver)()
    }
}

/// Type-erased submitted work, so one queue can hold jobs of any result type
pub(crate) trait QueuedWork: Send {
    /// Build the job future: runs the work against `timeout` and yields its settlement
    fn start(self: Box<Self>, queue_time: Duration, timeout: Duration) -> BoxFuture<'static, Settlement>;

    /// Fail the job without ever running it
    fn reject(self: Box<Self>);
}

pub(crate) type Reply<T, E> = oneshot::Sender<Result<JobResult<T>, JobError<E>>>;

pub(crate) struct Work<F, T, E> {
    work: F,
    reply: Reply<T, E>,
}

impl<F, T, E> Work<F, T, E> {
    pub(crate) fn new(work: F, reply: Reply<T, E>) -> Self {
        Self { work, reply }
    }
}

impl<F, Fut, T, E> QueuedWork for Work<F, T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    fn start(self: Box<Self>, queue_time: Duration, timeout: Duration) -> BoxFuture<'static, Settlement> {
        let Work { work, reply } = *self;
        Box::pin(async move {
            let started = Instant::now();
            // Whichever of work and timer finishes first settles; the other is dropped here.
            // A panic is caught here; the reply sender lives outside the caught future.
            let run = AssertUnwindSafe(async move { tokio::time::timeout(timeout, work()).await });
            let (outcome, settled) = match run.catch_unwind().await {
                Ok(Ok(Ok(result))) => (
                    JobOutcome::Succeeded,
                    Ok(JobResult {
                        result,
                        queue_time,
                        execution_time: started.elapsed(),
                    }),
                ),
                Ok(Ok(Err(err))) => (JobOutcome::Failed, Err(JobError::Failed(err))),
                Ok(Err(_)) => (JobOutcome::TimedOut, Err(JobError::Timeout(timeout))),
                Err(_) => (JobOutcome::Abandoned, Err(JobError::Abandoned)),
            };

            Settlement {
                outcome,
                deliver: Box::new(move || {
                    // Caller may have dropped its handle
                    let _ = reply.send(settled);
                }),
            }
        })
    }

    fn reject(self: Box<Self>) {
        let Work { reply, .. } = *self;
        let _ = reply.send(Err(JobError::Disposed));
    }
}

/// A submitted job waiting for dispatch
pub(crate) struct PendingJob {
    pub(crate) id: Uuid,
    pub(crate) enqueued_at: Instant,
    pub(crate) work: Box<dyn QueuedWork>,
}

impl PendingJob {
    pub(crate) fn new(id: Uuid, work: Box<dyn QueuedWork>) -> Self {
        Self {
            id,
            enqueued_at: Instant::now(),
            work,
        }
    }
}
