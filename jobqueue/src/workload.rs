//! Simulated workloads
//!
//! Builds batches of fake jobs (sleep, fail, or hang) and pushes them through a
//! [`Scheduler`], collecting per-job timings. Used by the `run` command.

use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

use crate::scheduler::{JobError, Scheduler, SchedulerStats};

/// Shape of a simulated workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Number of jobs to submit
    pub jobs: usize,

    /// How long each job sleeps, in milliseconds
    #[serde(rename = "duration-ms")]
    pub duration_ms: u64,

    /// Every Nth job fails instead of sleeping
    #[serde(rename = "fail-every")]
    pub fail_every: Option<usize>,

    /// Every Nth job never finishes on its own
    #[serde(rename = "hang-every")]
    pub hang_every: Option<usize>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            jobs: 10,
            duration_ms: 200,
            fail_every: None,
            hang_every: None,
        }
    }
}

impl WorkloadConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    fn behavior(&self, index: usize) -> Behavior {
        let every = |n: Option<usize>| n.is_some_and(|n| n > 0 && index % n == 0);
        if every(self.hang_every) {
            Behavior::Hang
        } else if every(self.fail_every) {
            Behavior::Fail
        } else {
            Behavior::Sleep
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Sleep,
    Fail,
    Hang,
}

/// Error returned by jobs configured to fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("simulated failure in job {index}")]
pub struct SimulatedFailure {
    pub index: usize,
}

/// Final status of one simulated job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    TimedOut,
    Disposed,
    Abandoned,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::TimedOut => "timed-out",
            JobStatus::Disposed => "disposed",
            JobStatus::Abandoned => "abandoned",
        };
        f.write_str(label)
    }
}

/// Outcome of one simulated job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    /// 1-based submission order
    pub index: usize,
    pub status: JobStatus,
    #[serde(rename = "queue-ms", skip_serializing_if = "Option::is_none")]
    pub queue_ms: Option<u64>,
    #[serde(rename = "execution-ms", skip_serializing_if = "Option::is_none")]
    pub execution_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything a workload run produced
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub jobs: Vec<JobReport>,
    #[serde(rename = "elapsed-ms")]
    pub elapsed_ms: u64,
    pub stats: SchedulerStats,
}

impl WorkloadReport {
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|job| job.status == status).count()
    }
}

/// Submit every job of `workload` to `scheduler` and wait for all of them to settle
pub async fn run_workload(scheduler: &Scheduler, workload: &WorkloadConfig) -> WorkloadReport {
    debug!(?workload, "run_workload: called");
    let started = Instant::now();
    let duration = workload.duration();

    let handles: Vec<_> = (1..=workload.jobs)
        .map(|index| {
            let behavior = workload.behavior(index);
            scheduler.submit(move || async move {
                match behavior {
                    Behavior::Sleep => {
                        tokio::time::sleep(duration).await;
                        Ok(index)
                    }
                    Behavior::Fail => Err(SimulatedFailure { index }),
                    Behavior::Hang => std::future::pending().await,
                }
            })
        })
        .collect();

    let jobs = join_all(handles)
        .await
        .into_iter()
        .zip(1..)
        .map(|(outcome, index)| match outcome {
            Ok(done) => JobReport {
                index,
                status: JobStatus::Succeeded,
                queue_ms: Some(done.queue_time_ms()),
                execution_ms: Some(done.execution_time_ms()),
                error: None,
            },
            Err(err) => {
                let status = match &err {
                    JobError::Failed(_) => JobStatus::Failed,
                    JobError::Timeout(_) => JobStatus::TimedOut,
                    JobError::Disposed => JobStatus::Disposed,
                    JobError::Abandoned => JobStatus::Abandoned,
                };
                JobReport {
                    index,
                    status,
                    queue_ms: None,
                    execution_ms: None,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect();

    WorkloadReport {
        jobs,
        elapsed_ms: started.elapsed().as_millis() as u64,
        stats: scheduler.stats(),
    }
}
