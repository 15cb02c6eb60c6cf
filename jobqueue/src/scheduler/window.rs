//! Trailing start-count window for rate limiting

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Start timestamps inside a trailing window
///
/// Starts are recorded in non-decreasing order, so the oldest is always at the front.
#[derive(Debug)]
pub(crate) struct RateWindow {
    starts: VecDeque<Instant>,
    span: Duration,
}

impl RateWindow {
    pub(crate) fn new(span: Duration) -> Self {
        Self {
            starts: VecDeque::new(),
            span,
        }
    }

    /// Drop starts that are at least `span` old
    pub(crate) fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.starts.front() {
            if now.saturating_duration_since(oldest) >= self.span {
                self.starts.pop_front();
            } else {
                break;
            }
        }
    }

    /// True when another start would exceed `limit`
    pub(crate) fn is_saturated(&self, limit: Option<u32>) -> bool {
        limit.is_some_and(|limit| self.starts.len() >= limit as usize)
    }

    pub(crate) fn record(&mut self, now: Instant) {
        self.starts.push_back(now);
    }

    pub(crate) fn len(&self) -> usize {
        self.starts.len()
    }
}
