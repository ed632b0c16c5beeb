//! Resilience primitives for calling unreliable dependencies.

pub mod circuit;
pub mod failure_window;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitGuard, CircuitState};
pub use failure_window::FailureWindow;
