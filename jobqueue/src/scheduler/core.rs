//! Scheduler implementation

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::SchedulerConfig;
use super::error::JobError;
use super::handle::JobHandle;
use super::queue::{JobOutcome, PendingJob, QueueState, SchedulerStats, Settlement, Work};
use super::window::RateWindow;

/// Internal state protected by mutex
struct SchedulerInner {
    /// FIFO of jobs waiting for dispatch
    queue: VecDeque<PendingJob>,

    /// Number of jobs currently executing
    running: usize,

    /// Start timestamps for rate limiting (sliding window)
    window: RateWindow,

    /// Set once by dispose, never cleared
    disposed: bool,

    /// Outstanding rate re-check timer, at most one
    recheck: Option<AbortHandle>,

    /// Statistics
    stats: SchedulerStats,
}

struct Shared {
    config: SchedulerConfig,
    inner: Mutex<SchedulerInner>,
}

/// The Scheduler runs submitted jobs in FIFO order under a concurrency limit,
/// a trailing-window rate limit and a per-job timeout.
///
/// Clones share the same queue and limits.
#[derive(Clone)]
pub struct Scheduler {
    shared: Arc<Shared>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    /// Create a scheduler after rejecting configs that would time out every job
    pub fn try_new(config: SchedulerConfig) -> eyre::Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create a new scheduler with the given configuration
    ///
    /// Does not validate; see [`try_new`](Self::try_new).
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "Scheduler::new: called");
        let window = RateWindow::new(config.rate_window());
        Self {
            shared: Arc::new(Shared {
                config,
                inner: Mutex::new(SchedulerInner {
                    queue: VecDeque::new(),
                    running: 0,
                    window,
                    disposed: false,
                    recheck: None,
                    stats: SchedulerStats::default(),
                }),
            }),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Submit work for execution
    ///
    /// Returns at once; the handle settles when the job succeeds, fails, times out
    /// or is dropped by [`dispose`](Self::dispose). Must be called inside a Tokio runtime.
    ///
    /// A job that exceeds the timeout has its work future dropped, so the work is cancelled
    /// at its next `.await` rather than left running in the background. A job whose work
    /// panics settles as [`JobError::Abandoned`].
    pub fn submit<F, Fut, T, E>(&self, work: F) -> JobHandle<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let id = Uuid::now_v7();
        let (reply_tx, reply_rx) = oneshot::channel();
        debug!(%id, "Scheduler::submit: called");

        {
            let mut inner = self.shared.lock();
            if inner.disposed {
                debug!(%id, "Scheduler::submit: disposed, rejecting");
                inner.stats.total_disposed += 1;
                let _ = reply_tx.send(Err(JobError::Disposed));
                return JobHandle::new(id, reply_rx);
            }

            inner
                .queue
                .push_back(PendingJob::new(id, Box::new(Work::new(work, reply_tx))));
            inner.stats.total_submitted += 1;
            inner.stats.peak_queue_depth = inner.stats.peak_queue_depth.max(inner.queue.len());
        }

        self.shared.dispatch();
        JobHandle::new(id, reply_rx)
    }

    /// Number of jobs waiting to start
    pub fn size(&self) -> usize {
        self.shared.lock().queue.len()
    }

    /// Number of jobs currently executing
    pub fn active(&self) -> usize {
        self.shared.lock().running
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().disposed
    }

    /// Stop accepting work and fail every pending job with [`JobError::Disposed`]
    ///
    /// Running jobs are left alone and settle on their own. Calling this again is a no-op.
    pub fn dispose(&self) {
        debug!("Scheduler::dispose: called");
        let drained: Vec<PendingJob> = {
            let mut inner = self.shared.lock();
            if inner.disposed {
                debug!("Scheduler::dispose: already disposed");
                return;
            }
            inner.disposed = true;
            if let Some(recheck) = inner.recheck.take() {
                recheck.abort();
            }
            let drained: Vec<_> = inner.queue.drain(..).collect();
            inner.stats.total_disposed += drained.len() as u64;
            drained
        };

        info!(pending = drained.len(), "Scheduler disposed");

        // Reject outside the lock, oldest first
        for job in drained {
            debug!(id = %job.id, "Scheduler::dispose: rejecting pending job");
            job.work.reject();
        }
    }

    /// Get current queue state
    pub fn queue_state(&self) -> QueueState {
        let inner = self.shared.lock();
        QueueState {
            running: inner.running,
            queued: inner.queue.len(),
            rate_limited: inner.recheck.is_some(),
            disposed: inner.disposed,
            stats: inner.stats.clone(),
        }
    }

    /// Get the scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        self.shared.lock().stats.clone()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        // State stays consistent across a panic in another holder, so keep going
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start as many queued jobs as capacity and rate budget allow
    fn dispatch(self: &Arc<Self>) {
        let mut inner = self.lock();

        loop {
            if inner.disposed || inner.running >= self.config.concurrency_limit || inner.queue.is_empty() {
                return;
            }

            let now = Instant::now();
            inner.window.prune(now);

            if inner.window.is_saturated(self.config.rate_limit) {
                if inner.recheck.is_none() {
                    debug!(
                        in_window = inner.window.len(),
                        queued = inner.queue.len(),
                        "Scheduler::dispatch: rate window full, scheduling re-check"
                    );
                    inner.stats.total_rate_limited += 1;
                    inner.recheck = Some(self.arm_recheck());
                }
                return;
            }

            let Some(job) = inner.queue.pop_front() else {
                return;
            };

            let queue_time = now.saturating_duration_since(job.enqueued_at);
            inner.running += 1;
            inner.window.record(now);
            inner.stats.total_started += 1;
            inner.stats.total_queue_time_ms += queue_time.as_millis() as u64;
            inner.stats.peak_concurrent = inner.stats.peak_concurrent.max(inner.running);

            debug!(id = %job.id, ?queue_time, running = inner.running, "Scheduler::dispatch: starting job");

            let id = job.id;
            let run = job.work.start(queue_time, self.config.timeout_limit());
            let shared = Arc::clone(self);
            tokio::spawn(async move {
                let settlement = run.await;
                shared.finish(id, settlement);
            });
        }
    }

    fn arm_recheck(self: &Arc<Self>) -> AbortHandle {
        let shared = Arc::clone(self);
        let delay = self.config.rate_recheck();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.lock().recheck = None;
            shared.dispatch();
        })
        .abort_handle()
    }

    /// Release the slot, then settle the caller, then pull the next job
    fn finish(self: &Arc<Self>, id: Uuid, settlement: Settlement) {
        {
            let mut inner = self.lock();
            inner.running -= 1;
            match settlement.outcome {
                JobOutcome::Succeeded => inner.stats.total_succeeded += 1,
                JobOutcome::Failed => inner.stats.total_failed += 1,
                JobOutcome::TimedOut => inner.stats.total_timed_out += 1,
                JobOutcome::Abandoned => inner.stats.total_abandoned += 1,
            }
        }

        match settlement.outcome {
            JobOutcome::TimedOut => warn!(%id, timeout = ?self.config.timeout_limit(), "Job timed out"),
            JobOutcome::Abandoned => warn!(%id, "Job panicked before settling"),
            _ => debug!(%id, outcome = ?settlement.outcome, "Scheduler::finish: job settled"),
        }

        settlement.deliver();
        self.dispatch();
    }
}
