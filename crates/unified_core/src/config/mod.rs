//! Unified configuration: schema, YAML/env loader, and hot-reload watcher.
//!
//! Precedence, highest to lowest: `UNIFIED_*` environment variables, the
//! YAML file, built-in defaults.

pub mod cli;
pub mod loader;
pub mod schema;
pub mod watcher;

pub use loader::{ConfigLoader, ValidationIssue};
pub use schema::{UnifiedConfig, ENV_PREFIX};
pub use watcher::ConfigWatcher;
