//! Configuration schema for all subsystems, with defaults and field
//! metadata.
//!
//! Duration-valued fields are plain millisecond integers with an `_ms`
//! suffix, matching their YAML keys, so a config file round-trips without
//! unit guessing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Environment variable prefix for configuration overrides, e.g.
/// `UNIFIED_LOGGER_LEVEL=debug`.
pub const ENV_PREFIX: &str = "UNIFIED_";

/// Thread pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadConfig {
    /// Worker count; 0 auto-detects from the CPU.
    pub pool_size: usize,
    /// One of `mutex`, `lockfree`, `bounded`.
    pub queue_type: String,
    pub max_queue_size: usize,
    pub thread_name_prefix: String,
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            pool_size: 0,
            queue_type: "lockfree".to_string(),
            max_queue_size: 10_000,
            thread_name_prefix: "worker".to_string(),
        }
    }
}

/// Logger settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`, `critical`, `off`.
    pub level: String,
    /// Any of `console`, `file`, `rotating_file`, `network`, `json`.
    pub writers: Vec<String>,
    #[serde(rename = "async")]
    pub async_write: bool,
    pub buffer_size: usize,
    pub file_path: String,
    pub max_file_size: usize,
    pub max_backup_files: usize,
    pub format_pattern: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            writers: vec!["console".to_string()],
            async_write: true,
            buffer_size: 8192,
            file_path: "./logs/app.log".to_string(),
            max_file_size: 10 * 1024 * 1024,
            max_backup_files: 5,
            format_pattern: "[%Y-%m-%d %H:%M:%S.%e] [%l] [%t] %v".to_string(),
        }
    }
}

/// Distributed tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    /// Fraction of traces sampled, 0.0 to 1.0.
    pub sampling_rate: f64,
    /// One of `otlp`, `jaeger`, `zipkin`, `console`.
    pub exporter: String,
    pub endpoint: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sampling_rate: 0.1,
            exporter: "otlp".to_string(),
            endpoint: "http://localhost:4317".to_string(),
        }
    }
}

/// Monitoring settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub metrics_interval_ms: u64,
    pub health_check_interval_ms: u64,
    pub tracing: TracingConfig,
    /// 0 disables the Prometheus endpoint.
    pub prometheus_port: u16,
    pub prometheus_path: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            metrics_interval_ms: 5000,
            health_check_interval_ms: 30_000,
            tracing: TracingConfig::default(),
            prometheus_port: 9090,
            prometheus_path: "/metrics".to_string(),
        }
    }
}

/// Database connection pool settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub min_size: usize,
    pub max_size: usize,
    pub idle_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_size: 5,
            max_size: 20,
            idle_timeout_ms: 60_000,
            acquire_timeout_ms: 5000,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// One of `postgresql`, `mysql`, `sqlite`, `mongodb`, `redis`; empty
    /// means no database.
    pub backend: String,
    pub connection_string: String,
    pub pool: PoolConfig,
    pub log_queries: bool,
    pub slow_query_threshold_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: String::new(),
            connection_string: String::new(),
            pool: PoolConfig::default(),
            log_queries: false,
            slow_query_threshold_ms: 1000,
        }
    }
}

/// TLS settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub enabled: bool,
    /// `1.2` or `1.3`.
    pub version: String,
    pub cert_path: String,
    pub key_path: String,
    pub ca_path: String,
    pub verify_peer: bool,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            version: "1.3".to_string(),
            cert_path: String::new(),
            key_path: String::new(),
            ca_path: String::new(),
            verify_peer: true,
        }
    }
}

/// Network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub tls: TlsConfig,
    /// One of `none`, `lz4`, `gzip`, `deflate`, `zstd`.
    pub compression: String,
    pub buffer_size: usize,
    pub connect_timeout_ms: u64,
    pub io_timeout_ms: u64,
    pub keepalive_interval_ms: u64,
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            tls: TlsConfig::default(),
            compression: "lz4".to_string(),
            buffer_size: 65_536,
            connect_timeout_ms: 5000,
            io_timeout_ms: 30_000,
            keepalive_interval_ms: 15_000,
            max_connections: 10_000,
        }
    }
}

/// Root configuration for the unified system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifiedConfig {
    pub thread: ThreadConfig,
    pub logger: LoggerConfig,
    pub monitoring: MonitoringConfig,
    pub database: DatabaseConfig,
    pub network: NetworkConfig,
}

impl UnifiedConfig {
    pub fn defaults() -> Self {
        Self::default()
    }

    /// Flatten to dot-separated leaf paths with stringified values, for
    /// change diffing.
    pub fn leaf_values(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        if let Ok(value) = serde_json::to_value(self) {
            flatten("", &value, &mut out);
        }
        out
    }

    /// Paths whose values differ between two configurations.
    pub fn changed_paths(&self, other: &UnifiedConfig) -> Vec<String> {
        let a = self.leaf_values();
        let b = other.leaf_values();
        let mut changed: Vec<String> = a
            .iter()
            .filter(|(path, value)| b.get(*path) != Some(value))
            .map(|(path, _)| path.clone())
            .collect();
        for path in b.keys() {
            if !a.contains_key(path) {
                changed.push(path.clone());
            }
        }
        changed.sort();
        changed
    }
}

fn flatten(prefix: &str, value: &serde_json::Value, out: &mut BTreeMap<String, String>) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, child, out);
            }
        }
        serde_json::Value::Array(items) => {
            let rendered: Vec<String> = items.iter().map(render_scalar).collect();
            out.insert(prefix.to_string(), rendered.join(","));
        }
        other => {
            out.insert(prefix.to_string(), render_scalar(other));
        }
    }
}

fn render_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Metadata for one configuration field. Serialized for documentation
/// output; never read back.
#[derive(Debug, Clone, Serialize)]
pub struct FieldMetadata {
    /// Dot-separated path, e.g. `logger.level`.
    pub path: &'static str,
    pub description: &'static str,
    pub hot_reloadable: bool,
    /// Environment variable overriding this field, when one exists.
    pub env_var: &'static str,
    /// Allowed values for enum-like fields; empty means unconstrained.
    pub allowed_values: &'static [&'static str],
}

/// Metadata for the documented configuration fields, one entry per leaf.
pub fn config_metadata() -> Vec<FieldMetadata> {
    vec![
        FieldMetadata {
            path: "thread.pool_size",
            description: "Number of worker threads (0 for auto)",
            hot_reloadable: false,
            env_var: "UNIFIED_THREAD_POOL_SIZE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "thread.queue_type",
            description: "Task queue type",
            hot_reloadable: false,
            env_var: "UNIFIED_THREAD_QUEUE_TYPE",
            allowed_values: &["mutex", "lockfree", "bounded"],
        },
        FieldMetadata {
            path: "thread.max_queue_size",
            description: "Maximum task queue size",
            hot_reloadable: false,
            env_var: "UNIFIED_THREAD_MAX_QUEUE_SIZE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "thread.thread_name_prefix",
            description: "Prefix for worker thread names",
            hot_reloadable: false,
            env_var: "UNIFIED_THREAD_NAME_PREFIX",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "logger.level",
            description: "Log level",
            hot_reloadable: true,
            env_var: "UNIFIED_LOGGER_LEVEL",
            allowed_values: &["trace", "debug", "info", "warn", "error", "critical", "off"],
        },
        FieldMetadata {
            path: "logger.writers",
            description: "Log writers (comma-separated)",
            hot_reloadable: false,
            env_var: "UNIFIED_LOGGER_WRITERS",
            allowed_values: &["console", "file", "rotating_file", "network", "json"],
        },
        FieldMetadata {
            path: "logger.async",
            description: "Enable async logging",
            hot_reloadable: false,
            env_var: "UNIFIED_LOGGER_ASYNC",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "logger.buffer_size",
            description: "Async buffer size",
            hot_reloadable: false,
            env_var: "UNIFIED_LOGGER_BUFFER_SIZE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "logger.file_path",
            description: "Log file path",
            hot_reloadable: true,
            env_var: "UNIFIED_LOGGER_FILE_PATH",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "logger.max_file_size",
            description: "Maximum log file size (bytes)",
            hot_reloadable: false,
            env_var: "UNIFIED_LOGGER_MAX_FILE_SIZE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "logger.max_backup_files",
            description: "Rotated log files to keep",
            hot_reloadable: false,
            env_var: "UNIFIED_LOGGER_MAX_BACKUP_FILES",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "logger.format_pattern",
            description: "Log line format pattern",
            hot_reloadable: false,
            env_var: "UNIFIED_LOGGER_FORMAT_PATTERN",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.enabled",
            description: "Enable monitoring",
            hot_reloadable: false,
            env_var: "UNIFIED_MONITORING_ENABLED",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.metrics_interval",
            description: "Metrics collection interval (ms)",
            hot_reloadable: true,
            env_var: "UNIFIED_MONITORING_METRICS_INTERVAL_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.health_check_interval",
            description: "Health check interval (ms)",
            hot_reloadable: false,
            env_var: "UNIFIED_MONITORING_HEALTH_CHECK_INTERVAL_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.prometheus_port",
            description: "Prometheus scrape port (0 disables)",
            hot_reloadable: false,
            env_var: "UNIFIED_MONITORING_PROMETHEUS_PORT",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.prometheus_path",
            description: "Prometheus scrape path",
            hot_reloadable: false,
            env_var: "UNIFIED_MONITORING_PROMETHEUS_PATH",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.tracing.enabled",
            description: "Enable distributed tracing",
            hot_reloadable: false,
            env_var: "UNIFIED_MONITORING_TRACING_ENABLED",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.tracing.sampling_rate",
            description: "Trace sampling rate",
            hot_reloadable: true,
            env_var: "UNIFIED_MONITORING_TRACING_SAMPLING_RATE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "monitoring.tracing.exporter",
            description: "Trace exporter",
            hot_reloadable: false,
            env_var: "UNIFIED_MONITORING_TRACING_EXPORTER",
            allowed_values: &["otlp", "jaeger", "zipkin", "console"],
        },
        FieldMetadata {
            path: "monitoring.tracing.endpoint",
            description: "Trace exporter endpoint URL",
            hot_reloadable: false,
            env_var: "UNIFIED_MONITORING_TRACING_ENDPOINT",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "database.backend",
            description: "Database backend type",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_BACKEND",
            allowed_values: &["postgresql", "mysql", "sqlite", "mongodb", "redis"],
        },
        FieldMetadata {
            path: "database.connection_string",
            description: "Database connection string",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_CONNECTION_STRING",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "database.log_queries",
            description: "Log every query",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_LOG_QUERIES",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "database.slow_query_threshold",
            description: "Slow query log threshold (ms)",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_SLOW_QUERY_THRESHOLD_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "database.pool.min_size",
            description: "Minimum pool size",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_POOL_MIN_SIZE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "database.pool.max_size",
            description: "Maximum pool size",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_POOL_MAX_SIZE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "database.pool.idle_timeout",
            description: "Idle connection timeout (ms)",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_POOL_IDLE_TIMEOUT_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "database.pool.acquire_timeout",
            description: "Connection acquire timeout (ms)",
            hot_reloadable: false,
            env_var: "UNIFIED_DATABASE_POOL_ACQUIRE_TIMEOUT_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.compression",
            description: "Compression algorithm",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_COMPRESSION",
            allowed_values: &["none", "lz4", "gzip", "deflate", "zstd"],
        },
        FieldMetadata {
            path: "network.buffer_size",
            description: "I/O buffer size",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_BUFFER_SIZE",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.connect_timeout",
            description: "Connect timeout (ms)",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_CONNECT_TIMEOUT_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.io_timeout",
            description: "I/O timeout (ms)",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_IO_TIMEOUT_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.keepalive_interval",
            description: "Keepalive interval (ms)",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_KEEPALIVE_INTERVAL_MS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.max_connections",
            description: "Maximum concurrent connections",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_MAX_CONNECTIONS",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.tls.enabled",
            description: "Enable TLS",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_TLS_ENABLED",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.tls.version",
            description: "TLS version",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_TLS_VERSION",
            allowed_values: &["1.2", "1.3"],
        },
        FieldMetadata {
            path: "network.tls.cert_path",
            description: "TLS certificate path",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_TLS_CERT_PATH",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.tls.key_path",
            description: "TLS private key path",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_TLS_KEY_PATH",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.tls.ca_path",
            description: "TLS CA bundle path",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_TLS_CA_PATH",
            allowed_values: &[],
        },
        FieldMetadata {
            path: "network.tls.verify_peer",
            description: "Verify the peer certificate",
            hot_reloadable: false,
            env_var: "UNIFIED_NETWORK_TLS_VERIFY_PEER",
            allowed_values: &[],
        },
    ]
}

/// Whether a field may change at runtime without a restart.
///
/// Accepts both the metadata path (`monitoring.metrics_interval`) and the
/// leaf-value path with the `_ms` suffix.
pub fn is_hot_reloadable(field_path: &str) -> bool {
    const HOT_RELOADABLE: [&str; 4] = [
        "logger.level",
        "logger.file_path",
        "monitoring.metrics_interval",
        "monitoring.tracing.sampling_rate",
    ];
    let normalized = field_path.strip_suffix("_ms").unwrap_or(field_path);
    HOT_RELOADABLE.contains(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UnifiedConfig::defaults();
        assert_eq!(config.thread.pool_size, 0);
        assert_eq!(config.thread.queue_type, "lockfree");
        assert_eq!(config.logger.level, "info");
        assert_eq!(config.logger.writers, ["console"]);
        assert_eq!(config.monitoring.metrics_interval_ms, 5000);
        assert!((config.monitoring.tracing.sampling_rate - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.database.pool.max_size, 20);
        assert_eq!(config.network.tls.version, "1.3");
        assert_eq!(config.network.compression, "lz4");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: UnifiedConfig =
            serde_yaml::from_str("logger:\n  level: debug\n").unwrap();
        assert_eq!(config.logger.level, "debug");
        assert_eq!(config.logger.buffer_size, 8192);
        assert_eq!(config.network.max_connections, 10_000);
    }

    #[test]
    fn test_leaf_values_flatten() {
        let leaves = UnifiedConfig::defaults().leaf_values();
        assert_eq!(leaves["logger.level"], "info");
        assert_eq!(leaves["monitoring.metrics_interval_ms"], "5000");
        assert_eq!(leaves["logger.writers"], "console");
        assert_eq!(leaves["network.tls.enabled"], "true");
    }

    #[test]
    fn test_changed_paths() {
        let a = UnifiedConfig::defaults();
        let mut b = a.clone();
        b.logger.level = "debug".to_string();
        b.monitoring.metrics_interval_ms = 1000;
        assert_eq!(
            a.changed_paths(&b),
            ["logger.level", "monitoring.metrics_interval_ms"]
        );
        assert!(a.changed_paths(&a.clone()).is_empty());
    }

    #[test]
    fn test_hot_reloadable() {
        assert!(is_hot_reloadable("logger.level"));
        assert!(is_hot_reloadable("monitoring.metrics_interval"));
        assert!(is_hot_reloadable("monitoring.metrics_interval_ms"));
        assert!(is_hot_reloadable("monitoring.tracing.sampling_rate"));
        assert!(!is_hot_reloadable("thread.pool_size"));
        assert!(!is_hot_reloadable("network.tls.enabled"));
    }

    #[test]
    fn test_metadata_paths_exist_as_leaves() {
        let leaves = UnifiedConfig::defaults().leaf_values();
        for field in config_metadata() {
            let direct = leaves.contains_key(field.path);
            let with_ms = leaves.contains_key(&format!("{}_ms", field.path));
            assert!(direct || with_ms, "missing leaf for {}", field.path);
        }
    }

    #[test]
    fn test_metadata_covers_every_leaf() {
        let metadata = config_metadata();
        for leaf in UnifiedConfig::defaults().leaf_values().keys() {
            let normalized = leaf.strip_suffix("_ms").unwrap_or(leaf);
            assert!(
                metadata.iter().any(|f| f.path == normalized),
                "no metadata entry for {leaf}"
            );
        }
    }

    #[test]
    fn test_metadata_serializes() {
        let rendered = serde_json::to_string(&config_metadata()).unwrap();
        assert!(rendered.contains("\"logger.level\""));
        assert!(rendered.contains("UNIFIED_NETWORK_TLS_VERIFY_PEER"));
    }
}
