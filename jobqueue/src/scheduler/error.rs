//! Job error types

use std::time::Duration;
use thiserror::Error;

/// Ways a submitted job can fail to produce a result
///
/// `E` is the error type of the submitted work. It is carried through
/// [`JobError::Failed`] untouched.
#[derive(Debug, Error, PartialEq)]
pub enum JobError<E> {
    #[error("Queue has been disposed")]
    Disposed,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Failed(E),

    #[error("Job ended without settling")]
    Abandoned,
}

impl<E> JobError<E> {
    /// Check if the job was rejected by disposal
    pub fn is_disposed(&self) -> bool {
        matches!(self, JobError::Disposed)
    }

    /// Check if the job exceeded its timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, JobError::Timeout(_))
    }

    /// Take back the work's own error, if that is what failed the job
    pub fn into_job_error(self) -> Option<E> {
        match self {
            JobError::Failed(err) => Some(err),
            _ => None,
        }
    }
}
