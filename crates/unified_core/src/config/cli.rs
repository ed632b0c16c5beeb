//! Command-line configuration support: typed `--set key=value` overrides
//! and stable process exit codes.

use crate::error::ErrorInfo;
use crate::error_codes::config as codes;
use crate::result::{err, Result, UnitResult};

use super::schema::UnifiedConfig;

/// Process exit codes for configuration tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    /// Malformed argument or unparseable value for a known key.
    InvalidArgument = 2,
    /// Missing or unreadable file, malformed payload.
    LoadError = 3,
    ValidationError = 4,
    UnknownKey = 5,
}

/// Map a configuration error to its exit code. Unknown codes fall back to
/// the load-error exit.
pub fn exit_code_for(error: &ErrorInfo) -> ExitCode {
    match error.code {
        codes::FILE_NOT_FOUND | codes::PARSE_ERROR | codes::IO_ERROR => ExitCode::LoadError,
        codes::VALIDATION_ERROR => ExitCode::ValidationError,
        codes::INVALID_KEY => ExitCode::UnknownKey,
        codes::INVALID_VALUE => ExitCode::InvalidArgument,
        _ => ExitCode::LoadError,
    }
}

/// Apply one `key=value` override to a configuration.
///
/// Keys are the dot-separated leaf paths from the schema. Unknown keys and
/// unparseable values fail without modifying the configuration.
pub fn apply_set(config: &mut UnifiedConfig, key: &str, value: &str) -> UnitResult {
    match key {
        "thread.pool_size" => config.thread.pool_size = parse_num(key, value)?,
        "thread.queue_type" => config.thread.queue_type = value.to_string(),
        "thread.max_queue_size" => config.thread.max_queue_size = parse_num(key, value)?,
        "thread.thread_name_prefix" => config.thread.thread_name_prefix = value.to_string(),

        "logger.level" => config.logger.level = value.to_string(),
        "logger.writers" => config.logger.writers = parse_list(value),
        "logger.async" => config.logger.async_write = parse_bool(key, value)?,
        "logger.buffer_size" => config.logger.buffer_size = parse_num(key, value)?,
        "logger.file_path" => config.logger.file_path = value.to_string(),
        "logger.max_file_size" => config.logger.max_file_size = parse_num(key, value)?,
        "logger.max_backup_files" => config.logger.max_backup_files = parse_num(key, value)?,
        "logger.format_pattern" => config.logger.format_pattern = value.to_string(),

        "monitoring.enabled" => config.monitoring.enabled = parse_bool(key, value)?,
        "monitoring.metrics_interval_ms" => {
            config.monitoring.metrics_interval_ms = parse_num(key, value)?
        }
        "monitoring.health_check_interval_ms" => {
            config.monitoring.health_check_interval_ms = parse_num(key, value)?
        }
        "monitoring.prometheus_port" => config.monitoring.prometheus_port = parse_num(key, value)?,
        "monitoring.prometheus_path" => config.monitoring.prometheus_path = value.to_string(),
        "monitoring.tracing.enabled" => {
            config.monitoring.tracing.enabled = parse_bool(key, value)?
        }
        "monitoring.tracing.sampling_rate" => {
            config.monitoring.tracing.sampling_rate = parse_num(key, value)?
        }
        "monitoring.tracing.exporter" => {
            config.monitoring.tracing.exporter = value.to_string()
        }
        "monitoring.tracing.endpoint" => {
            config.monitoring.tracing.endpoint = value.to_string()
        }

        "database.backend" => config.database.backend = value.to_string(),
        "database.connection_string" => config.database.connection_string = value.to_string(),
        "database.log_queries" => config.database.log_queries = parse_bool(key, value)?,
        "database.slow_query_threshold_ms" => {
            config.database.slow_query_threshold_ms = parse_num(key, value)?
        }
        "database.pool.min_size" => config.database.pool.min_size = parse_num(key, value)?,
        "database.pool.max_size" => config.database.pool.max_size = parse_num(key, value)?,
        "database.pool.idle_timeout_ms" => {
            config.database.pool.idle_timeout_ms = parse_num(key, value)?
        }
        "database.pool.acquire_timeout_ms" => {
            config.database.pool.acquire_timeout_ms = parse_num(key, value)?
        }

        "network.compression" => config.network.compression = value.to_string(),
        "network.buffer_size" => config.network.buffer_size = parse_num(key, value)?,
        "network.connect_timeout_ms" => {
            config.network.connect_timeout_ms = parse_num(key, value)?
        }
        "network.io_timeout_ms" => config.network.io_timeout_ms = parse_num(key, value)?,
        "network.keepalive_interval_ms" => {
            config.network.keepalive_interval_ms = parse_num(key, value)?
        }
        "network.max_connections" => config.network.max_connections = parse_num(key, value)?,
        "network.tls.enabled" => config.network.tls.enabled = parse_bool(key, value)?,
        "network.tls.version" => config.network.tls.version = value.to_string(),
        "network.tls.cert_path" => config.network.tls.cert_path = value.to_string(),
        "network.tls.key_path" => config.network.tls.key_path = value.to_string(),
        "network.tls.ca_path" => config.network.tls.ca_path = value.to_string(),
        "network.tls.verify_peer" => config.network.tls.verify_peer = parse_bool(key, value)?,

        _ => {
            return err(
                codes::INVALID_KEY,
                format!("Unknown configuration key: {key}"),
                "config_cli",
            )
        }
    }
    Ok(())
}

/// Split a `key=value` argument. A missing key or `=` is an invalid
/// argument, not an unknown key.
pub fn split_assignment(arg: &str) -> Result<(&str, &str)> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => err(
            codes::INVALID_VALUE,
            format!("Expected key=value, got: {arg}"),
            "config_cli",
        ),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ErrorInfo::new(
            codes::INVALID_VALUE,
            format!("Invalid value for {key}: {value}"),
            "config_cli",
        )
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => err(
            codes::INVALID_VALUE,
            format!("Invalid boolean for {key}: {value}"),
            "config_cli",
        ),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
