//! Sliding time window of failure timestamps.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Thread-safe sliding window. Expired entries are pruned on read, so an
/// idle window costs nothing.
pub struct FailureWindow {
    window: Duration,
    failures: Mutex<VecDeque<Instant>>,
}

impl FailureWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Record a failure at the current time.
    pub fn record_failure(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(Instant::now());
        }
    }

    /// Number of failures still inside the window.
    pub fn failure_count(&self) -> usize {
        let Ok(mut failures) = self.failures.lock() else {
            return 0;
        };
        Self::prune(&mut failures, self.window);
        failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failure_count() == 0
    }

    /// Drop all recorded failures.
    pub fn reset(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    fn prune(failures: &mut VecDeque<Instant>, window: Duration) {
        let now = Instant::now();
        // Timestamps are appended in order, so expired entries are all at
        // the front.
        while let Some(front) = failures.front() {
            if now.duration_since(*front) > window {
                failures.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_within_window() {
        let window = FailureWindow::new(Duration::from_secs(60));
        assert!(window.is_empty());
        window.record_failure();
        window.record_failure();
        assert_eq!(window.failure_count(), 2);
    }

    #[test]
    fn test_expired_failures_pruned() {
        let window = FailureWindow::new(Duration::from_millis(30));
        window.record_failure();
        window.record_failure();
        std::thread::sleep(Duration::from_millis(60));
        window.record_failure();
        assert_eq!(window.failure_count(), 1);
    }

    #[test]
    fn test_reset() {
        let window = FailureWindow::new(Duration::from_secs(60));
        window.record_failure();
        window.reset();
        assert!(window.is_empty());
    }
}
