//! Logging abstraction: levels, entries, the [`Logger`] trait, and the
//! global [`registry`].
//!
//! The crate does not ship a concrete backend; applications register their
//! own [`Logger`] implementations (file writers, `tracing` bridges) with the
//! registry. [`NullLogger`] is the always-available fallback.

pub mod registry;

pub use registry::{LoggerFactory, LoggerRegistry};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::ErrorInfo;
use crate::error_codes;
use crate::result::UnitResult;
use crate::source_location::SourceLocation;

/// Severity levels, ordered from most to least verbose. `Off` disables all
/// output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ErrorInfo;

    /// Case-insensitive; accepts the common aliases `warn` and `fatal`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "fatal" | "critical" => Ok(LogLevel::Critical),
            "off" => Ok(LogLevel::Off),
            other => Err(ErrorInfo::new(
                error_codes::common::INVALID_ARGUMENT,
                format!("unknown log level: {other}"),
                "logger",
            )),
        }
    }
}

/// A single structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub location: Option<SourceLocation>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Pluggable logging backend.
///
/// Implementations must be thread-safe; the registry hands out shared
/// `Arc<dyn Logger>` handles.
pub trait Logger: Send + Sync {
    /// Log a message at the given level.
    fn log(&self, level: LogLevel, message: &str) -> UnitResult;

    /// Log a message with an explicit source location.
    fn log_at(&self, level: LogLevel, message: &str, location: &SourceLocation) -> UnitResult {
        self.log(level, &format!("{message} ({location})"))
    }

    /// Log a prebuilt entry.
    fn log_entry(&self, entry: &LogEntry) -> UnitResult {
        match &entry.location {
            Some(loc) => self.log_at(entry.level, &entry.message, loc),
            None => self.log(entry.level, &entry.message),
        }
    }

    /// Whether a message at this level would be emitted.
    fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.get_level() && level != LogLevel::Off
    }

    fn set_level(&self, level: LogLevel);

    fn get_level(&self) -> LogLevel;

    /// Flush buffered output.
    fn flush(&self) -> UnitResult;
}

/// Logger that accepts and discards everything. Used as the registry
/// fallback so call sites never need to null-check.
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _level: LogLevel, _message: &str) -> UnitResult {
        Ok(())
    }

    fn set_level(&self, _level: LogLevel) {}

    fn get_level(&self) -> LogLevel {
        LogLevel::Off
    }

    fn is_enabled(&self, _level: LogLevel) -> bool {
        false
    }

    fn flush(&self) -> UnitResult {
        Ok(())
    }
}

static NULL_LOGGER: Lazy<Arc<NullLogger>> = Lazy::new(|| Arc::new(NullLogger));

/// Shared [`NullLogger`] instance.
pub fn null_logger() -> Arc<dyn Logger> {
    NULL_LOGGER.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Critical);
        assert!(LogLevel::Critical < LogLevel::Off);
    }

    #[test]
    fn test_level_parsing_aliases() {
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("Fatal".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert_eq!("critical".parse::<LogLevel>().unwrap(), LogLevel::Critical);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_round_trip() {
        for level in [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warning,
            LogLevel::Error,
            LogLevel::Critical,
            LogLevel::Off,
        ] {
            assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn test_null_logger_discards_everything() {
        let logger = null_logger();
        assert!(logger.log(LogLevel::Critical, "ignored").is_ok());
        assert!(!logger.is_enabled(LogLevel::Critical));
        assert_eq!(logger.get_level(), LogLevel::Off);
        assert!(logger.flush().is_ok());
    }

    #[test]
    fn test_entry_with_location() {
        let entry = LogEntry::new(LogLevel::Info, "hello")
            .with_location(SourceLocation::caller());
        assert!(entry.location.unwrap().file.ends_with("mod.rs"));
    }
}
