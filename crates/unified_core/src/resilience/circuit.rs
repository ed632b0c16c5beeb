//! Circuit breaker over a sliding failure window.
//!
//! State machine: CLOSED admits everything and counts failures in the
//! window; crossing the failure threshold opens the circuit. OPEN rejects
//! requests until the timeout elapses, then HALF_OPEN admits a bounded
//! number of probe requests. Enough consecutive successes close the
//! circuit; any failure reopens it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::stats::{Stats, StatsValue};

use super::failure_window::FailureWindow;

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Breaker tuning. Read-only after construction.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures within the window before the circuit opens.
    pub failure_threshold: usize,
    /// Consecutive half-open successes before the circuit closes.
    pub success_threshold: usize,
    /// Sliding window over which failures are counted.
    pub failure_window: Duration,
    /// How long the circuit stays open before probing.
    pub timeout: Duration,
    /// Probe requests admitted while half-open.
    pub half_open_max_requests: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            failure_window: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            half_open_max_requests: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: usize) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_success_threshold(mut self, threshold: usize) -> Self {
        self.success_threshold = threshold;
        self
    }

    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_half_open_max_requests(mut self, max: usize) -> Self {
        self.half_open_max_requests = max;
        self
    }
}

struct BreakerInner {
    state: CircuitState,
    consecutive_successes: usize,
    half_open_requests: usize,
    last_state_change: Instant,
}

/// Thread-safe circuit breaker.
///
/// All methods take `&self`; transitions are serialized on an internal
/// mutex while [`CircuitBreaker::state`] reads a lock-free snapshot.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    failure_window: FailureWindow,
    inner: Mutex<BreakerInner>,
    state_snapshot: AtomicU8,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            failure_window: FailureWindow::new(config.failure_window),
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_successes: 0,
                half_open_requests: 0,
                last_state_change: Instant::now(),
            }),
            state_snapshot: AtomicU8::new(CircuitState::Closed.to_u8()),
        }
    }

    /// Whether a request may go through right now.
    ///
    /// In HALF_OPEN this admits the request and counts it against the probe
    /// budget, so call it exactly once per attempt.
    pub fn allow_request(&self) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if inner.last_state_change.elapsed() >= self.config.timeout {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                    // The probing request counts toward the limit.
                    inner.half_open_requests += 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.half_open_requests < self.config.half_open_max_requests {
                    inner.half_open_requests += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful operation. Closes the circuit after enough
    /// consecutive half-open successes.
    pub fn record_success(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if inner.state == CircuitState::HalfOpen {
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= self.config.success_threshold {
                self.transition(&mut inner, CircuitState::Closed);
                self.failure_window.reset();
            }
        }
    }

    /// Record a failed operation. Opens the circuit when the window crosses
    /// the threshold; any half-open failure reopens immediately.
    pub fn record_failure(&self) {
        self.failure_window.record_failure();

        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        match inner.state {
            CircuitState::HalfOpen => self.transition(&mut inner, CircuitState::Open),
            CircuitState::Closed => {
                if self.failure_window.failure_count() >= self.config.failure_threshold {
                    self.transition(&mut inner, CircuitState::Open);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Current state, without taking the transition lock.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_snapshot.load(Ordering::Acquire))
    }

    /// RAII guard that records a failure on drop unless the operation was
    /// marked successful.
    pub fn make_guard(&self) -> CircuitGuard<'_> {
        CircuitGuard {
            breaker: self,
            committed: false,
        }
    }

    fn transition(&self, inner: &mut BreakerInner, to: CircuitState) {
        inner.state = to;
        inner.consecutive_successes = 0;
        inner.half_open_requests = 0;
        inner.last_state_change = Instant::now();
        self.state_snapshot.store(to.to_u8(), Ordering::Release);
    }
}

impl Stats for CircuitBreaker {
    fn name(&self) -> &'static str {
        "circuit_breaker"
    }

    fn stats(&self) -> BTreeMap<String, StatsValue> {
        let state = self.state();
        let (consecutive_successes, half_open_requests) = self
            .inner
            .lock()
            .map(|i| (i.consecutive_successes, i.half_open_requests))
            .unwrap_or((0, 0));

        let mut metrics = BTreeMap::new();
        metrics.insert("current_state".to_string(), StatsValue::from(state.as_str()));
        metrics.insert(
            "failure_count".to_string(),
            StatsValue::from(self.failure_window.failure_count()),
        );
        metrics.insert(
            "consecutive_successes".to_string(),
            StatsValue::from(consecutive_successes),
        );
        metrics.insert(
            "half_open_requests".to_string(),
            StatsValue::from(half_open_requests),
        );
        metrics.insert(
            "failure_threshold".to_string(),
            StatsValue::from(self.config.failure_threshold),
        );
        metrics.insert(
            "is_open".to_string(),
            StatsValue::from(state == CircuitState::Open),
        );
        metrics
    }
}

/// Scoped recorder tied to one operation.
///
/// Dropping the guard without calling [`CircuitGuard::record_success`]
/// records a failure, so early returns and panics count against the
/// breaker. Not cloneable or movable across the operation boundary.
pub struct CircuitGuard<'a> {
    breaker: &'a CircuitBreaker,
    committed: bool,
}

impl CircuitGuard<'_> {
    /// Mark the operation successful and consume the guard.
    pub fn record_success(mut self) {
        self.committed = true;
        self.breaker.record_success();
    }
}

impl Drop for CircuitGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.breaker.record_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig::default()
            .with_failure_threshold(2)
            .with_success_threshold(2)
            .with_timeout(Duration::from_millis(50))
            .with_half_open_max_requests(3)
    }

    #[test]
    fn test_closed_allows_requests() {
        let breaker = CircuitBreaker::default();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());
    }

    #[test]
    fn test_opens_after_threshold() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn test_recovery_cycle() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        std::thread::sleep(Duration::from_millis(70));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        // The window was reset on close, so one failure does not reopen.
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(70));
        assert!(breaker.allow_request());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn test_half_open_request_budget() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(70));

        // First probe transitions and consumes one slot; two more fit.
        assert!(breaker.allow_request());
        assert!(breaker.allow_request());
        assert!(breaker.allow_request());
        assert!(!breaker.allow_request());
    }

    #[test]
    fn test_guard_records_failure_on_drop() {
        let breaker = CircuitBreaker::new(fast_config());
        {
            let _guard = breaker.make_guard();
            // Dropped without success.
        }
        {
            let _guard = breaker.make_guard();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn test_guard_success_commits() {
        let breaker = CircuitBreaker::new(fast_config());
        for _ in 0..5 {
            let guard = breaker.make_guard();
            guard.record_success();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn test_stats_keys() {
        let breaker = CircuitBreaker::new(fast_config());
        breaker.record_failure();
        let metrics = breaker.stats();
        assert_eq!(metrics["current_state"], StatsValue::from("closed"));
        assert_eq!(metrics["failure_count"], StatsValue::from(1usize));
        assert_eq!(metrics["failure_threshold"], StatsValue::from(2usize));
        assert_eq!(metrics["is_open"], StatsValue::from(false));
        assert_eq!(breaker.name(), "circuit_breaker");
    }
}
