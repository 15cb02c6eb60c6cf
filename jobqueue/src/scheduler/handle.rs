//! JobHandle - caller's side of a submitted job

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use uuid::Uuid;

use super::error::JobError;
use super::queue::JobResult;

/// Future that settles once with the job's result or error
///
/// Dropping the handle does not cancel the job; it still runs and occupies a slot.
#[derive(Debug)]
pub struct JobHandle<T, E> {
    id: Uuid,
    rx: oneshot::Receiver<Result<JobResult<T>, JobError<E>>>,
}

impl<T, E> JobHandle<T, E> {
    pub(crate) fn new(id: Uuid, rx: oneshot::Receiver<Result<JobResult<T>, JobError<E>>>) -> Self {
        Self { id, rx }
    }

    /// Identifier the scheduler uses for this job in its logs
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl<T, E> Future for JobHandle<T, E> {
    type Output = Result<JobResult<T>, JobError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the job task died before settling
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(JobError::Abandoned)))
    }
}
