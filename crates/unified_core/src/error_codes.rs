//! Centralized error code registry for all subsystems.
//!
//! Error codes are partitioned into per-subsystem ranges so they never
//! collide:
//!
//! - `0`: success
//! - `-1` to `-99`: common errors
//! - `-100` to `-199`: thread subsystem
//! - `-200` to `-299`: logger subsystem
//! - `-300` to `-399`: monitoring subsystem
//! - `-400` to `-499`: container subsystem (DI codes live in `-480..=-499`)
//! - `-500` to `-599`: database subsystem
//! - `-600` to `-699`: network subsystem
//! - `1001+`: configuration loader
//! - `2001+`: configuration watcher

/// Common error codes (`-1` to `-99`). Code `0` means success.
pub mod common {
    pub const SUCCESS: i32 = 0;
    pub const INVALID_ARGUMENT: i32 = -1;
    pub const NOT_FOUND: i32 = -2;
    pub const PERMISSION_DENIED: i32 = -3;
    pub const TIMEOUT: i32 = -4;
    pub const CANCELLED: i32 = -5;
    pub const NOT_INITIALIZED: i32 = -6;
    pub const ALREADY_EXISTS: i32 = -7;
    pub const OUT_OF_MEMORY: i32 = -8;
    pub const IO_ERROR: i32 = -9;
    pub const NETWORK_ERROR: i32 = -10;
    pub const REGISTRY_FROZEN: i32 = -11;
    pub const INTERNAL_ERROR: i32 = -99;
}

/// Thread subsystem error codes (`-100` to `-199`).
pub mod thread {
    pub const BASE: i32 = -100;

    pub const POOL_FULL: i32 = BASE;
    pub const POOL_SHUTDOWN: i32 = BASE - 1;
    pub const POOL_NOT_STARTED: i32 = BASE - 2;
    pub const INVALID_POOL_SIZE: i32 = BASE - 3;

    pub const WORKER_FAILED: i32 = BASE - 20;
    pub const WORKER_NOT_FOUND: i32 = BASE - 21;
    pub const WORKER_BUSY: i32 = BASE - 22;

    pub const JOB_REJECTED: i32 = BASE - 40;
    pub const JOB_TIMEOUT: i32 = BASE - 41;
    pub const JOB_CANCELLED: i32 = BASE - 42;
    pub const INVALID_JOB: i32 = BASE - 43;

    pub const QUEUE_FULL: i32 = BASE - 60;
    pub const QUEUE_EMPTY: i32 = BASE - 61;
    pub const QUEUE_STOPPED: i32 = BASE - 62;
}

/// Logger subsystem error codes (`-200` to `-299`).
pub mod logger {
    pub const BASE: i32 = -200;

    pub const FILE_OPEN_FAILED: i32 = BASE;
    pub const FILE_WRITE_FAILED: i32 = BASE - 1;
    pub const FILE_CLOSE_FAILED: i32 = BASE - 2;
    pub const FILE_ROTATION_FAILED: i32 = BASE - 3;

    pub const WRITER_NOT_INITIALIZED: i32 = BASE - 20;
    pub const WRITER_STOPPED: i32 = BASE - 21;
    pub const WRITER_FULL: i32 = BASE - 22;

    pub const INVALID_FORMAT: i32 = BASE - 40;
    pub const FORMAT_ERROR: i32 = BASE - 41;
}

/// Monitoring subsystem error codes (`-300` to `-399`).
pub mod monitoring {
    pub const BASE: i32 = -300;

    pub const METRIC_NOT_FOUND: i32 = BASE;
    pub const INVALID_METRIC_TYPE: i32 = BASE - 1;
    pub const METRIC_COLLECTION_FAILED: i32 = BASE - 2;

    pub const STORAGE_FULL: i32 = BASE - 20;
    pub const STORAGE_ERROR: i32 = BASE - 21;

    pub const EVENT_PUBLISH_FAILED: i32 = BASE - 40;
    pub const EVENT_SUBSCRIBE_FAILED: i32 = BASE - 41;
}

/// Container subsystem error codes (`-400` to `-499`).
///
/// The dependency-injection container reserves `-480..=-499` within this
/// range so its codes never collide with value/serialization codes.
pub mod container {
    pub const BASE: i32 = -400;

    pub const VALUE_TYPE_MISMATCH: i32 = BASE;
    pub const INVALID_VALUE_TYPE: i32 = BASE - 1;
    pub const VALUE_CONVERSION_FAILED: i32 = BASE - 2;

    pub const SERIALIZATION_FAILED: i32 = BASE - 20;
    pub const DESERIALIZATION_FAILED: i32 = BASE - 21;

    pub const KEY_NOT_FOUND: i32 = BASE - 60;
    pub const DUPLICATE_KEY: i32 = BASE - 61;
}

/// Dependency-injection error codes (reserved sub-range of the container
/// namespace).
pub mod di {
    pub const SERVICE_NOT_REGISTERED: i32 = -480;
    pub const CIRCULAR_DEPENDENCY: i32 = -481;
    pub const ALREADY_REGISTERED: i32 = -482;
    pub const FACTORY_ERROR: i32 = -483;
    pub const INVALID_LIFETIME: i32 = -484;
    pub const SCOPED_FROM_ROOT: i32 = -485;
}

/// Database subsystem error codes (`-500` to `-599`).
pub mod database {
    pub const BASE: i32 = -500;

    pub const CONNECTION_FAILED: i32 = BASE;
    pub const CONNECTION_LOST: i32 = BASE - 1;
    pub const CONNECTION_TIMEOUT: i32 = BASE - 2;
    pub const INVALID_CONNECTION_STRING: i32 = BASE - 3;

    pub const POOL_EXHAUSTED: i32 = BASE - 20;
    pub const POOL_SHUTDOWN: i32 = BASE - 21;

    pub const QUERY_FAILED: i32 = BASE - 40;
    pub const QUERY_TIMEOUT: i32 = BASE - 42;
}

/// Network subsystem error codes (`-600` to `-699`).
pub mod network {
    pub const BASE: i32 = -600;

    pub const CONNECTION_FAILED: i32 = BASE;
    pub const CONNECTION_REFUSED: i32 = BASE - 1;
    pub const CONNECTION_TIMEOUT: i32 = BASE - 2;
    pub const CONNECTION_CLOSED: i32 = BASE - 3;

    pub const SESSION_NOT_FOUND: i32 = BASE - 20;
    pub const SESSION_EXPIRED: i32 = BASE - 21;

    pub const SEND_FAILED: i32 = BASE - 40;
    pub const RECEIVE_FAILED: i32 = BASE - 41;

    pub const SERVER_NOT_STARTED: i32 = BASE - 60;
    pub const BIND_FAILED: i32 = BASE - 62;
}

/// Configuration loader error codes (`1001+`).
pub mod config {
    pub const FILE_NOT_FOUND: i32 = 1001;
    pub const PARSE_ERROR: i32 = 1002;
    pub const VALIDATION_ERROR: i32 = 1003;
    pub const INVALID_VALUE: i32 = 1004;
    pub const IO_ERROR: i32 = 1005;
    pub const INVALID_KEY: i32 = 1006;
}

/// Configuration watcher error codes (`2001+`).
pub mod watcher {
    pub const WATCH_FAILED: i32 = 2001;
    pub const RELOAD_FAILED: i32 = 2002;
    pub const VALIDATION_FAILED: i32 = 2003;
    pub const ROLLBACK_FAILED: i32 = 2004;
    pub const NOT_STARTED: i32 = 2005;
    pub const ALREADY_RUNNING: i32 = 2006;
}

/// Human-readable message for a well-known error code.
///
/// Unknown codes fall back to `"Unknown error"`; callers that need richer
/// text should carry it in [`crate::error::ErrorInfo::message`] instead.
pub fn message_for(code: i32) -> &'static str {
    match code {
        common::SUCCESS => "Success",
        common::INVALID_ARGUMENT => "Invalid argument",
        common::NOT_FOUND => "Not found",
        common::PERMISSION_DENIED => "Permission denied",
        common::TIMEOUT => "Timeout",
        common::CANCELLED => "Cancelled",
        common::NOT_INITIALIZED => "Not initialized",
        common::ALREADY_EXISTS => "Already exists",
        common::OUT_OF_MEMORY => "Out of memory",
        common::IO_ERROR => "I/O error",
        common::NETWORK_ERROR => "Network error",
        common::REGISTRY_FROZEN => "Registry is frozen",
        common::INTERNAL_ERROR => "Internal error",

        thread::POOL_FULL => "Thread pool full",
        thread::POOL_SHUTDOWN => "Thread pool shutdown",
        thread::JOB_REJECTED => "Job rejected",
        thread::JOB_TIMEOUT => "Job timeout",

        logger::FILE_OPEN_FAILED => "Failed to open log file",
        logger::FILE_WRITE_FAILED => "Failed to write to log file",
        logger::FILE_ROTATION_FAILED => "Log file rotation failed",

        monitoring::METRIC_NOT_FOUND => "Metric not found",
        monitoring::STORAGE_FULL => "Metric storage full",

        container::VALUE_TYPE_MISMATCH => "Value type mismatch",
        container::SERIALIZATION_FAILED => "Serialization failed",

        di::SERVICE_NOT_REGISTERED => "Service not registered",
        di::CIRCULAR_DEPENDENCY => "Circular dependency detected",
        di::ALREADY_REGISTERED => "Service already registered",
        di::FACTORY_ERROR => "Service factory failed",
        di::SCOPED_FROM_ROOT => "Scoped service resolved from root container",

        database::CONNECTION_FAILED => "Database connection failed",
        database::POOL_EXHAUSTED => "Connection pool exhausted",
        database::QUERY_FAILED => "Database query failed",

        network::CONNECTION_FAILED => "Network connection failed",
        network::SEND_FAILED => "Network send failed",
        network::SERVER_NOT_STARTED => "Server not started",

        config::FILE_NOT_FOUND => "Configuration file not found",
        config::PARSE_ERROR => "Configuration parse error",
        config::VALIDATION_ERROR => "Configuration validation failed",
        config::INVALID_KEY => "Unknown configuration key",

        _ => "Unknown error",
    }
}

/// Stable category name for an error code, derived from its range.
pub fn category_name(code: i32) -> &'static str {
    if code >= 2001 {
        return "config_watcher";
    }
    if code >= 1001 {
        return "config";
    }
    if code >= 0 {
        return "success";
    }
    if code > thread::BASE {
        return "common";
    }
    if code > logger::BASE {
        return "thread";
    }
    if code > monitoring::BASE {
        return "logger";
    }
    if code > container::BASE {
        return "monitoring";
    }
    if code > database::BASE {
        return "container";
    }
    if code > network::BASE {
        return "database";
    }
    "network"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_do_not_collide() {
        assert!(common::INTERNAL_ERROR > thread::BASE);
        assert!(thread::QUEUE_STOPPED > logger::BASE);
        assert!(di::SERVICE_NOT_REGISTERED < container::KEY_NOT_FOUND);
        assert!(di::SCOPED_FROM_ROOT > database::BASE);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(category_name(0), "success");
        assert_eq!(category_name(common::NOT_FOUND), "common");
        assert_eq!(category_name(di::CIRCULAR_DEPENDENCY), "container");
        assert_eq!(category_name(network::SEND_FAILED), "network");
        assert_eq!(category_name(config::PARSE_ERROR), "config");
        assert_eq!(category_name(watcher::WATCH_FAILED), "config_watcher");
    }

    #[test]
    fn test_messages() {
        assert_eq!(message_for(common::SUCCESS), "Success");
        assert_eq!(message_for(common::NOT_INITIALIZED), "Not initialized");
        assert_eq!(message_for(-9999), "Unknown error");
    }
}
