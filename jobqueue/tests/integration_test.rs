//! Integration tests for jobqueue
//!
//! These tests verify end-to-end behavior of the scheduler through its public API.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use jobqueue::config::Config;
use jobqueue::scheduler::{JobError, Scheduler, SchedulerConfig};
use tempfile::TempDir;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
struct Boom(&'static str);

async fn nap(ms: u64) -> Result<(), Boom> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(())
}

fn limited(concurrency_limit: usize) -> Scheduler {
    Scheduler::new(SchedulerConfig {
        concurrency_limit,
        ..Default::default()
    })
}

// =============================================================================
// Result passthrough
// =============================================================================

#[tokio::test]
async fn test_basic_job_returns_value() {
    let scheduler = Scheduler::default();

    let done = scheduler.submit(|| async { Ok::<_, Boom>("test") }).await.unwrap();

    assert_eq!(done.result, "test");
    assert!(done.queue_time < Duration::from_secs(1));
    assert!(done.execution_time < Duration::from_secs(1));
}

#[tokio::test]
async fn test_job_error_is_not_wrapped() {
    let scheduler = Scheduler::default();

    let err = scheduler
        .submit(|| async { Err::<(), _>(Boom("fail")) })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "fail");
    assert_eq!(err.into_job_error(), Some(Boom("fail")));
    assert_eq!(scheduler.active(), 0);
}

#[tokio::test]
async fn test_execution_time_measured_from_start() {
    let scheduler = limited(1);

    let first = scheduler.submit(|| nap(150));
    let second = scheduler.submit(|| nap(50));

    let first = first.await.unwrap();
    let second = second.await.unwrap();

    assert!(first.execution_time >= Duration::from_millis(150));
    // Waiting behind the first job shows up as queue time, not execution time
    assert!(second.queue_time >= Duration::from_millis(140));
    assert!(second.execution_time >= Duration::from_millis(50));
    assert!(second.execution_time < Duration::from_millis(140));
}

// =============================================================================
// Concurrency and ordering
// =============================================================================

#[tokio::test]
async fn test_size_and_active_tracking() {
    let scheduler = limited(1);

    let a = scheduler.submit(|| nap(100));
    let b = scheduler.submit(|| nap(100));

    assert_eq!(scheduler.size(), 1);
    assert_eq!(scheduler.active(), 1);

    a.await.unwrap();
    b.await.unwrap();
    assert_eq!(scheduler.size(), 0);
    assert_eq!(scheduler.active(), 0);
}

#[tokio::test]
async fn test_concurrency_limit_holds() {
    let scheduler = limited(3);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            scheduler.submit(move || async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(60)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, Boom>(())
            })
        })
        .collect();

    assert_eq!(scheduler.active(), 3);
    assert_eq!(scheduler.size(), 5);

    for outcome in join_all(handles).await {
        assert!(outcome.is_ok());
    }
    assert_eq!(peak.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.stats().peak_concurrent, 3);
}

#[tokio::test]
async fn test_fifo_start_order() {
    let scheduler = limited(1);
    let order = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (1..=6)
        .map(|n| {
            let order = order.clone();
            scheduler.submit(move || async move {
                order.lock().unwrap().push(n);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, Boom>(n)
            })
        })
        .collect();

    let results: Vec<_> = join_all(handles).await.into_iter().map(|r| r.unwrap().result).collect();

    assert_eq!(*order.lock().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(results, vec![1, 2, 3, 4, 5, 6]);
}

// =============================================================================
// Timeout
// =============================================================================

#[tokio::test]
async fn test_timeout_rejects_and_frees_slot() {
    let scheduler = Scheduler::new(SchedulerConfig {
        timeout_limit_secs: 1,
        ..Default::default()
    });
    let finished = Arc::new(AtomicBool::new(false));
    let flag = finished.clone();

    let err = scheduler
        .submit(move || async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            flag.store(true, Ordering::SeqCst);
            Ok::<_, Boom>(())
        })
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert_eq!(err, JobError::Timeout(Duration::from_secs(1)));
    assert_eq!(scheduler.active(), 0);

    // The late natural completion never surfaces
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(!finished.load(Ordering::SeqCst));
    let stats = scheduler.stats();
    assert_eq!(stats.total_timed_out, 1);
    assert_eq!(stats.total_succeeded, 0);
}

#[tokio::test]
async fn test_timeout_lets_queue_drain() {
    let scheduler = Scheduler::new(SchedulerConfig {
        concurrency_limit: 1,
        timeout_limit_secs: 1,
        ..Default::default()
    });

    let stuck = scheduler.submit(|| async { std::future::pending::<Result<(), Boom>>().await });
    let next = scheduler.submit(|| async { Ok::<_, Boom>(42) });

    assert!(stuck.await.unwrap_err().is_timeout());
    let next = next.await.unwrap();
    assert_eq!(next.result, 42);
    assert!(next.queue_time >= Duration::from_millis(900));
}

// =============================================================================
// Rate limiting
// =============================================================================

#[tokio::test]
async fn test_rate_limit_delays_extra_start() {
    let scheduler = Scheduler::new(SchedulerConfig {
        rate_limit: Some(2),
        rate_window_secs: 1,
        ..Default::default()
    });
    let start = Instant::now();

    let first = scheduler.submit(|| nap(10));
    let second = scheduler.submit(|| nap(10));
    let third = scheduler.submit(|| nap(10));

    first.await.unwrap();
    second.await.unwrap();
    assert_eq!(scheduler.size(), 1);

    let third = third.await.unwrap();
    // Delayed, not rejected
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert!(third.queue_time >= Duration::from_millis(900));
    assert!(scheduler.stats().total_rate_limited >= 1);
}

// =============================================================================
// Disposal
// =============================================================================

#[tokio::test]
async fn test_dispose_rejects_pending_jobs() {
    let scheduler = limited(0);

    let pending = scheduler.submit(|| nap(1000));
    scheduler.dispose();

    let err = pending.await.unwrap_err();
    assert!(err.is_disposed());
    assert_eq!(err.to_string(), "Queue has been disposed");
}

#[tokio::test]
async fn test_dispose_leaves_running_jobs_alone() {
    let scheduler = limited(1);

    let running = scheduler.submit(|| async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok::<_, Boom>("done")
    });
    let waiting = scheduler.submit(|| nap(10));

    scheduler.dispose();
    assert_eq!(scheduler.size(), 0);
    assert_eq!(scheduler.active(), 1);

    assert!(waiting.await.unwrap_err().is_disposed());
    assert_eq!(running.await.unwrap().result, "done");
    assert_eq!(scheduler.active(), 0);
}

#[tokio::test]
async fn test_submit_after_dispose_never_runs_work() {
    let scheduler = Scheduler::default();
    scheduler.dispose();

    let invoked = Arc::new(AtomicBool::new(false));
    let flag = invoked.clone();
    let err = scheduler
        .submit(move || {
            flag.store(true, Ordering::SeqCst);
            nap(1)
        })
        .await
        .unwrap_err();

    assert!(err.is_disposed());
    assert!(!invoked.load(Ordering::SeqCst));
    assert_eq!(scheduler.size(), 0);
}

#[tokio::test]
async fn test_dispose_is_idempotent() {
    let scheduler = limited(0);
    let a = scheduler.submit(|| nap(1));
    let b = scheduler.submit(|| nap(1));

    scheduler.dispose();
    let after_first = scheduler.queue_state();
    scheduler.dispose();
    let after_second = scheduler.queue_state();

    assert!(a.await.unwrap_err().is_disposed());
    assert!(b.await.unwrap_err().is_disposed());
    assert!(after_second.disposed);
    assert_eq!(after_first.stats, after_second.stats);
    assert_eq!(after_second.stats.total_disposed, 2);
}

// =============================================================================
// Panicking work
// =============================================================================

#[tokio::test]
async fn test_panicking_job_is_abandoned() {
    let scheduler = limited(1);

    let bad = scheduler.submit(|| async {
        if true {
            panic!("job blew up");
        }
        Ok::<u8, Boom>(0)
    });
    let good = scheduler.submit(|| async { Ok::<_, Boom>(1u8) });

    assert_eq!(bad.await.unwrap_err(), JobError::Abandoned);
    assert_eq!(good.await.unwrap().result, 1);

    let stats = scheduler.stats();
    assert_eq!(stats.total_abandoned, 1);
    assert_eq!(stats.total_succeeded, 1);
    assert_eq!(scheduler.active(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_panicking_job_releases_slot_before_settling() {
    let scheduler = limited(1);

    for _ in 0..200 {
        let bad = scheduler.submit(|| async {
            if true {
                panic!("job blew up");
            }
            Ok::<u8, Boom>(0)
        });

        assert_eq!(bad.await.unwrap_err(), JobError::Abandoned);
        assert_eq!(scheduler.active(), 0);
    }

    let stats = scheduler.stats();
    assert_eq!(stats.total_abandoned, 200);
    assert_eq!(stats.total_started, 200);
}

// =============================================================================
// Config Tests
// =============================================================================

#[tokio::test]
async fn test_config_file_drives_scheduler() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("jobqueue.yml");
    std::fs::write(
        &path,
        "scheduler:\n  concurrency-limit: 2\n  timeout-limit-secs: 5\nworkload:\n  jobs: 3\n",
    )
    .expect("Failed to write config");

    let config = Config::load(Some(&path)).expect("Failed to load config");
    config.validate().expect("Config should be valid");
    assert_eq!(config.scheduler.timeout_limit_secs, 5);

    let scheduler = Scheduler::new(config.scheduler.clone());
    let handles: Vec<_> = (0..config.workload.jobs).map(|_| scheduler.submit(|| nap(50))).collect();
    assert_eq!(scheduler.active(), 2);
    assert_eq!(scheduler.size(), 1);
    join_all(handles).await;
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("absent.yml");

    let err = Config::load(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("absent.yml"));
}
