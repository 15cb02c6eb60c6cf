//! Scheduler configuration

use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduler configuration
///
/// Fixed for the lifetime of a [`Scheduler`](super::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Max jobs executing at the same time (0 means nothing ever starts)
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Max job starts per rate window (None means unbounded)
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: Option<u32>,

    /// Max execution time per job in seconds, measured from dispatch
    #[serde(rename = "timeout-limit-secs", default = "default_timeout_limit_secs")]
    pub timeout_limit_secs: u64,

    /// Rate window duration in seconds
    #[serde(rename = "rate-window-secs", default = "default_rate_window_secs")]
    pub rate_window_secs: u64,

    /// Delay before re-checking a saturated rate window, in milliseconds (0 is treated as 1)
    #[serde(rename = "rate-recheck-ms", default = "default_rate_recheck_ms")]
    pub rate_recheck_ms: u64,
}

fn default_concurrency_limit() -> usize {
    1000
}

fn default_timeout_limit_secs() -> u64 {
    1200
}

fn default_rate_window_secs() -> u64 {
    60
}

fn default_rate_recheck_ms() -> u64 {
    100
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            rate_limit: None,
            timeout_limit_secs: default_timeout_limit_secs(),
            rate_window_secs: default_rate_window_secs(),
            rate_recheck_ms: default_rate_recheck_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Get the per-job timeout as a Duration
    pub fn timeout_limit(&self) -> Duration {
        Duration::from_secs(self.timeout_limit_secs)
    }

    /// Get the rate window as a Duration
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }

    /// Get the rate re-check interval as a Duration, never shorter than 1ms
    pub fn rate_recheck(&self) -> Duration {
        Duration::from_millis(self.rate_recheck_ms.max(1))
    }

    /// Reject settings that would make the scheduler spin or fail every job
    pub fn validate(&self) -> Result<()> {
        if self.timeout_limit_secs == 0 {
            return Err(eyre!("timeout-limit-secs must be greater than zero"));
        }
        if self.rate_window_secs == 0 {
            return Err(eyre!("rate-window-secs must be greater than zero"));
        }
        if self.rate_recheck_ms == 0 {
            return Err(eyre!("rate-recheck-ms must be greater than zero"));
        }
        Ok(())
    }
}
