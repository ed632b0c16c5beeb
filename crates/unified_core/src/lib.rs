//! Core runtime foundation: error model, logger registry, dependency
//! injection, circuit breaker, and unified configuration.
//!
//! The crate is organized around a few cooperating pieces:
//!
//! - [`error`] and [`result`]: the `ErrorInfo`/`Result` error model with
//!   namespaced codes from [`error_codes`] and caller-location capture.
//! - [`logger`]: the `Logger` trait plus a process-wide [`logger::LoggerRegistry`]
//!   with lazy factories and freeze semantics.
//! - [`container`]: a type-erased service container with singleton,
//!   transient, and scoped lifetimes and cycle detection.
//! - [`bootstrap`]: ordered system startup and shutdown built on the
//!   logger registry.
//! - [`resilience`]: a circuit breaker with a sliding failure window.
//! - [`config`]: the YAML/env configuration schema, loader, hot-reload
//!   watcher, and CLI override support.
//!
//! Mutating operations on the global registries are recorded in the
//! [`audit`] log.

pub mod audit;
pub mod bootstrap;
pub mod config;
pub mod container;
pub mod error;
pub mod error_codes;
pub mod logger;
pub mod optional;
pub mod resilience;
pub mod result;
pub mod source_location;
pub mod stats;

pub use audit::{AuditAction, AuditEvent, AuditLog};
pub use bootstrap::SystemBootstrapper;
pub use config::{ConfigLoader, ConfigWatcher, UnifiedConfig, ValidationIssue};
pub use container::{ServiceContainer, ServiceLifetime, ServiceScope};
pub use error::{ErrorCategory, ErrorInfo};
pub use logger::{LogEntry, LogLevel, Logger, LoggerRegistry, NullLogger};
pub use optional::OptionExt;
pub use resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use result::{Result, ResultExt, UnitResult};
pub use source_location::SourceLocation;
pub use stats::{Stats, StatsSnapshot, StatsValue};
