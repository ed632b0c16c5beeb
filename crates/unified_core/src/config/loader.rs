//! YAML and environment configuration loading with validation.
//!
//! Precedence, highest to lowest: `UNIFIED_*` environment variables, the
//! YAML document, schema defaults. `${VAR}` references inside the YAML are
//! substituted before parsing; unset variables are left as-is.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error_codes::config as codes;
use crate::result::{err, Result, UnitResult};

use super::schema::UnifiedConfig;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("static pattern"));

const TOP_LEVEL_KEYS: [&str; 5] = ["thread", "logger", "monitoring", "database", "network"];

/// One validation finding. Warnings do not fail loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field_path: String,
    pub message: String,
    pub is_warning: bool,
}

impl ValidationIssue {
    fn error(field_path: &str, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.to_string(),
            message: message.into(),
            is_warning: false,
        }
    }

    fn warning(field_path: &str, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.to_string(),
            message: message.into(),
            is_warning: true,
        }
    }
}

/// Stateless configuration loader.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from a YAML file, then apply environment overrides and
    /// validate.
    pub fn load(path: impl AsRef<Path>) -> Result<UnifiedConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return err(
                codes::FILE_NOT_FOUND,
                format!("Configuration file not found: {}", path.display()),
                "config_loader",
            );
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::ErrorInfo::new(
                codes::IO_ERROR,
                format!("Failed to read configuration file: {e}"),
                "config_loader",
            )
        })?;
        Self::load_from_str(&content)
    }

    /// Load from a YAML string, then apply environment overrides and
    /// validate.
    ///
    /// The document may nest everything under a `unified_system` key or
    /// put the sections at the root. Unknown top-level sections are
    /// rejected; unknown nested keys are ignored.
    pub fn load_from_str(yaml: &str) -> Result<UnifiedConfig> {
        let expanded = Self::expand_env_vars(yaml);

        let root: serde_yaml::Value = serde_yaml::from_str(&expanded).map_err(|e| {
            crate::error::ErrorInfo::new(
                codes::PARSE_ERROR,
                format!("YAML parse error: {e}"),
                "config_loader",
            )
        })?;

        let section = if let serde_yaml::Value::Mapping(map) = &root {
            map.iter()
                .find(|(key, _)| key.as_str() == Some("unified_system"))
                .map(|(_, value)| value.clone())
                .unwrap_or_else(|| root.clone())
        } else {
            root
        };

        if let serde_yaml::Value::Mapping(map) = &section {
            for key in map.keys() {
                let name = key.as_str().unwrap_or_default();
                if !TOP_LEVEL_KEYS.contains(&name) {
                    return err(
                        codes::PARSE_ERROR,
                        format!("Unknown top-level configuration key: {name}"),
                        "config_loader",
                    );
                }
            }
        }

        let mut config: UnifiedConfig = match section {
            serde_yaml::Value::Null => UnifiedConfig::defaults(),
            section => serde_yaml::from_value(section).map_err(|e| {
                crate::error::ErrorInfo::new(
                    codes::PARSE_ERROR,
                    format!("Failed to parse configuration: {e}"),
                    "config_loader",
                )
            })?,
        };

        Self::merge_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    /// Defaults plus environment overrides, validated.
    pub fn load_from_env() -> Result<UnifiedConfig> {
        let mut config = UnifiedConfig::defaults();
        Self::merge_env_overrides(&mut config);
        Self::validate(&config)?;
        Ok(config)
    }

    pub fn defaults() -> UnifiedConfig {
        UnifiedConfig::defaults()
    }

    /// Replace `${VAR}` references with environment values; unset
    /// variables keep the literal pattern.
    pub fn expand_env_vars(value: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(value, |caps: &Captures<'_>| {
                std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
            })
            .into_owned()
    }

    /// Fail on the first validation error; warnings pass.
    pub fn validate(config: &UnifiedConfig) -> UnitResult {
        for issue in Self::validation_issues(config) {
            if !issue.is_warning {
                return err(
                    codes::VALIDATION_ERROR,
                    format!(
                        "Validation failed for {}: {}",
                        issue.field_path, issue.message
                    ),
                    "config_loader",
                );
            }
        }
        Ok(())
    }

    /// All validation findings, errors and warnings.
    pub fn validation_issues(config: &UnifiedConfig) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        // Thread
        const QUEUE_TYPES: [&str; 3] = ["mutex", "lockfree", "bounded"];
        if !QUEUE_TYPES.contains(&config.thread.queue_type.as_str()) {
            issues.push(ValidationIssue::error(
                "thread.queue_type",
                format!(
                    "Invalid queue type: {}. Valid values: mutex, lockfree, bounded",
                    config.thread.queue_type
                ),
            ));
        }
        if config.thread.max_queue_size == 0 {
            issues.push(ValidationIssue::error(
                "thread.max_queue_size",
                "Queue size must be greater than 0",
            ));
        }

        // Logger
        const LEVELS: [&str; 7] = ["trace", "debug", "info", "warn", "error", "critical", "off"];
        if !LEVELS.contains(&config.logger.level.as_str()) {
            issues.push(ValidationIssue::error(
                "logger.level",
                format!(
                    "Invalid log level: {}. Valid values: trace, debug, info, warn, error, critical, off",
                    config.logger.level
                ),
            ));
        }
        const WRITERS: [&str; 5] = ["console", "file", "rotating_file", "network", "json"];
        for writer in &config.logger.writers {
            if !WRITERS.contains(&writer.as_str()) {
                issues.push(ValidationIssue::error(
                    "logger.writers",
                    format!(
                        "Invalid writer: {writer}. Valid values: console, file, rotating_file, network, json"
                    ),
                ));
            }
        }
        if config.logger.async_write && config.logger.buffer_size < 1024 {
            issues.push(ValidationIssue::warning(
                "logger.buffer_size",
                "Buffer size is very small for async logging. Consider using at least 1024 bytes.",
            ));
        }

        // Monitoring
        let rate = config.monitoring.tracing.sampling_rate;
        if !(0.0..=1.0).contains(&rate) {
            issues.push(ValidationIssue::error(
                "monitoring.tracing.sampling_rate",
                "Sampling rate must be between 0.0 and 1.0",
            ));
        }
        const EXPORTERS: [&str; 4] = ["otlp", "jaeger", "zipkin", "console"];
        if !EXPORTERS.contains(&config.monitoring.tracing.exporter.as_str()) {
            issues.push(ValidationIssue::error(
                "monitoring.tracing.exporter",
                format!(
                    "Invalid exporter: {}. Valid values: otlp, jaeger, zipkin, console",
                    config.monitoring.tracing.exporter
                ),
            ));
        }
        if config.monitoring.metrics_interval_ms < 1000 {
            issues.push(ValidationIssue::warning(
                "monitoring.metrics_interval",
                "Metrics interval is very short (<1s). This may cause performance issues.",
            ));
        }

        // Database
        if !config.database.backend.is_empty() {
            const BACKENDS: [&str; 5] = ["postgresql", "mysql", "sqlite", "mongodb", "redis"];
            if !BACKENDS.contains(&config.database.backend.as_str()) {
                issues.push(ValidationIssue::error(
                    "database.backend",
                    format!(
                        "Invalid backend: {}. Valid values: postgresql, mysql, sqlite, mongodb, redis",
                        config.database.backend
                    ),
                ));
            }
        }
        if config.database.pool.min_size > config.database.pool.max_size {
            issues.push(ValidationIssue::error(
                "database.pool",
                "min_size cannot be greater than max_size",
            ));
        }
        if config.database.pool.max_size == 0 {
            issues.push(ValidationIssue::error(
                "database.pool.max_size",
                "Pool max_size must be greater than 0",
            ));
        }

        // Network
        const COMPRESSIONS: [&str; 5] = ["none", "lz4", "gzip", "deflate", "zstd"];
        if !COMPRESSIONS.contains(&config.network.compression.as_str()) {
            issues.push(ValidationIssue::error(
                "network.compression",
                format!(
                    "Invalid compression: {}. Valid values: none, lz4, gzip, deflate, zstd",
                    config.network.compression
                ),
            ));
        }
        const TLS_VERSIONS: [&str; 2] = ["1.2", "1.3"];
        if !TLS_VERSIONS.contains(&config.network.tls.version.as_str()) {
            issues.push(ValidationIssue::error(
                "network.tls.version",
                format!(
                    "Invalid TLS version: {}. Valid values: 1.2, 1.3",
                    config.network.tls.version
                ),
            ));
        }
        if config.network.buffer_size < 4096 {
            issues.push(ValidationIssue::warning(
                "network.buffer_size",
                "Buffer size is very small (<4KB). This may cause performance issues.",
            ));
        }
        if config.network.tls.enabled
            && config.network.tls.verify_peer
            && config.network.tls.ca_path.is_empty()
        {
            issues.push(ValidationIssue::warning(
                "network.tls.ca_path",
                "TLS is enabled with verify_peer but no CA path specified.",
            ));
        }

        issues
    }

    fn merge_env_overrides(config: &mut UnifiedConfig) {
        // Thread
        env_usize("UNIFIED_THREAD_POOL_SIZE", &mut config.thread.pool_size);
        env_string("UNIFIED_THREAD_QUEUE_TYPE", &mut config.thread.queue_type);
        env_usize(
            "UNIFIED_THREAD_MAX_QUEUE_SIZE",
            &mut config.thread.max_queue_size,
        );
        env_string(
            "UNIFIED_THREAD_NAME_PREFIX",
            &mut config.thread.thread_name_prefix,
        );

        // Logger
        env_string("UNIFIED_LOGGER_LEVEL", &mut config.logger.level);
        env_bool("UNIFIED_LOGGER_ASYNC", &mut config.logger.async_write);
        env_usize("UNIFIED_LOGGER_BUFFER_SIZE", &mut config.logger.buffer_size);
        env_string("UNIFIED_LOGGER_FILE_PATH", &mut config.logger.file_path);
        env_usize(
            "UNIFIED_LOGGER_MAX_FILE_SIZE",
            &mut config.logger.max_file_size,
        );
        env_usize(
            "UNIFIED_LOGGER_MAX_BACKUP_FILES",
            &mut config.logger.max_backup_files,
        );
        env_string(
            "UNIFIED_LOGGER_FORMAT_PATTERN",
            &mut config.logger.format_pattern,
        );
        env_list("UNIFIED_LOGGER_WRITERS", &mut config.logger.writers);

        // Monitoring
        env_bool("UNIFIED_MONITORING_ENABLED", &mut config.monitoring.enabled);
        env_u64(
            "UNIFIED_MONITORING_METRICS_INTERVAL_MS",
            &mut config.monitoring.metrics_interval_ms,
        );
        env_u64(
            "UNIFIED_MONITORING_HEALTH_CHECK_INTERVAL_MS",
            &mut config.monitoring.health_check_interval_ms,
        );
        env_u16(
            "UNIFIED_MONITORING_PROMETHEUS_PORT",
            &mut config.monitoring.prometheus_port,
        );
        env_string(
            "UNIFIED_MONITORING_PROMETHEUS_PATH",
            &mut config.monitoring.prometheus_path,
        );
        env_bool(
            "UNIFIED_MONITORING_TRACING_ENABLED",
            &mut config.monitoring.tracing.enabled,
        );
        env_f64(
            "UNIFIED_MONITORING_TRACING_SAMPLING_RATE",
            &mut config.monitoring.tracing.sampling_rate,
        );
        env_string(
            "UNIFIED_MONITORING_TRACING_EXPORTER",
            &mut config.monitoring.tracing.exporter,
        );
        env_string(
            "UNIFIED_MONITORING_TRACING_ENDPOINT",
            &mut config.monitoring.tracing.endpoint,
        );

        // Database
        env_string("UNIFIED_DATABASE_BACKEND", &mut config.database.backend);
        env_string(
            "UNIFIED_DATABASE_CONNECTION_STRING",
            &mut config.database.connection_string,
        );
        env_bool(
            "UNIFIED_DATABASE_LOG_QUERIES",
            &mut config.database.log_queries,
        );
        env_u64(
            "UNIFIED_DATABASE_SLOW_QUERY_THRESHOLD_MS",
            &mut config.database.slow_query_threshold_ms,
        );
        env_usize(
            "UNIFIED_DATABASE_POOL_MIN_SIZE",
            &mut config.database.pool.min_size,
        );
        env_usize(
            "UNIFIED_DATABASE_POOL_MAX_SIZE",
            &mut config.database.pool.max_size,
        );
        env_u64(
            "UNIFIED_DATABASE_POOL_IDLE_TIMEOUT_MS",
            &mut config.database.pool.idle_timeout_ms,
        );
        env_u64(
            "UNIFIED_DATABASE_POOL_ACQUIRE_TIMEOUT_MS",
            &mut config.database.pool.acquire_timeout_ms,
        );

        // Network
        env_string("UNIFIED_NETWORK_COMPRESSION", &mut config.network.compression);
        env_usize("UNIFIED_NETWORK_BUFFER_SIZE", &mut config.network.buffer_size);
        env_u64(
            "UNIFIED_NETWORK_CONNECT_TIMEOUT_MS",
            &mut config.network.connect_timeout_ms,
        );
        env_u64(
            "UNIFIED_NETWORK_IO_TIMEOUT_MS",
            &mut config.network.io_timeout_ms,
        );
        env_u64(
            "UNIFIED_NETWORK_KEEPALIVE_INTERVAL_MS",
            &mut config.network.keepalive_interval_ms,
        );
        env_usize(
            "UNIFIED_NETWORK_MAX_CONNECTIONS",
            &mut config.network.max_connections,
        );
        env_bool("UNIFIED_NETWORK_TLS_ENABLED", &mut config.network.tls.enabled);
        env_string("UNIFIED_NETWORK_TLS_VERSION", &mut config.network.tls.version);
        env_string(
            "UNIFIED_NETWORK_TLS_CERT_PATH",
            &mut config.network.tls.cert_path,
        );
        env_string("UNIFIED_NETWORK_TLS_KEY_PATH", &mut config.network.tls.key_path);
        env_string("UNIFIED_NETWORK_TLS_CA_PATH", &mut config.network.tls.ca_path);
        env_bool(
            "UNIFIED_NETWORK_TLS_VERIFY_PEER",
            &mut config.network.tls.verify_peer,
        );
    }
}

// Typed override helpers. Unparseable values are ignored so a stray
// environment variable cannot break startup.

fn env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
    }
}

fn env_usize(name: &str, target: &mut usize) {
    if let Ok(value) = std::env::var(name) {
        if let Ok(parsed) = value.trim().parse() {
            *target = parsed;
        }
    }
}

fn env_u64(name: &str, target: &mut u64) {
    if let Ok(value) = std::env::var(name) {
        if let Ok(parsed) = value.trim().parse() {
            *target = parsed;
        }
    }
}

fn env_u16(name: &str, target: &mut u16) {
    if let Ok(value) = std::env::var(name) {
        if let Ok(parsed) = value.trim().parse() {
            *target = parsed;
        }
    }
}

fn env_f64(name: &str, target: &mut f64) {
    if let Ok(value) = std::env::var(name) {
        if let Ok(parsed) = value.trim().parse() {
            *target = parsed;
        }
    }
}

fn env_bool(name: &str, target: &mut bool) {
    if let Ok(value) = std::env::var(name) {
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => *target = true,
            "false" | "0" | "no" | "off" => *target = false,
            _ => {}
        }
    }
}

fn env_list(name: &str, target: &mut Vec<String>) {
    if let Ok(value) = std::env::var(name) {
        *target = value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect();
    }
}
