//! Component statistics interface.
//!
//! Components expose their runtime metrics as a flat name/value map; the
//! trait turns that into a timestamped JSON snapshot for dashboards and
//! diagnostics dumps.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One metric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatsValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl From<i64> for StatsValue {
    fn from(v: i64) -> Self {
        StatsValue::Int(v)
    }
}

impl From<usize> for StatsValue {
    fn from(v: usize) -> Self {
        StatsValue::Int(v as i64)
    }
}

impl From<f64> for StatsValue {
    fn from(v: f64) -> Self {
        StatsValue::Float(v)
    }
}

impl From<bool> for StatsValue {
    fn from(v: bool) -> Self {
        StatsValue::Bool(v)
    }
}

impl From<&str> for StatsValue {
    fn from(v: &str) -> Self {
        StatsValue::Text(v.to_string())
    }
}

/// Point-in-time metrics for one component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub component: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<String, StatsValue>,
}

/// Implemented by components that report runtime metrics.
pub trait Stats {
    /// Stable component name, e.g. `"circuit_breaker"`.
    fn name(&self) -> &'static str;

    /// Current metrics as a flat map.
    fn stats(&self) -> BTreeMap<String, StatsValue>;

    /// Timestamped snapshot of the current metrics.
    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            component: self.name().to_string(),
            timestamp: Utc::now(),
            metrics: self.stats(),
        }
    }

    /// JSON rendering of [`Stats::snapshot`].
    fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl Stats for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn stats(&self) -> BTreeMap<String, StatsValue> {
            let mut m = BTreeMap::new();
            m.insert("count".to_string(), StatsValue::from(3usize));
            m.insert("rate".to_string(), StatsValue::from(0.5));
            m.insert("open".to_string(), StatsValue::from(false));
            m.insert("state".to_string(), StatsValue::from("closed"));
            m
        }
    }

    #[test]
    fn test_snapshot_carries_component_and_metrics() {
        let snap = Fixed.snapshot();
        assert_eq!(snap.component, "fixed");
        assert_eq!(snap.metrics.len(), 4);
    }

    #[test]
    fn test_json_shape() {
        let json = Fixed.to_json();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["component"], "fixed");
        assert_eq!(parsed["metrics"]["count"], 3);
        assert_eq!(parsed["metrics"]["rate"], 0.5);
        assert_eq!(parsed["metrics"]["open"], false);
        assert_eq!(parsed["metrics"]["state"], "closed");
        // RFC 3339 timestamp in UTC.
        let ts = parsed["timestamp"].as_str().unwrap();
        assert!(ts.ends_with('Z') || ts.contains("+00:00"));
    }
}
