//! Integration tests for configuration loading precedence and hot reload.

use std::fs;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use unified_core::{ConfigLoader, ConfigWatcher};

// Environment variables are process-global; serialize the tests that touch
// them.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn env_overrides_file_overrides_defaults() {
    let _env = ENV_LOCK.lock().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unified.yaml");
    fs::write(
        &path,
        "unified_system:\n  logger:\n    level: debug\n    buffer_size: 4096\n  thread:\n    pool_size: 4\n",
    )
    .unwrap();

    std::env::set_var("UNIFIED_LOGGER_LEVEL", "error");

    let config = ConfigLoader::load(&path).unwrap();
    std::env::remove_var("UNIFIED_LOGGER_LEVEL");

    // Env beats the file, the file beats defaults, defaults fill the rest.
    assert_eq!(config.logger.level, "error");
    assert_eq!(config.logger.buffer_size, 4096);
    assert_eq!(config.thread.pool_size, 4);
    assert_eq!(config.network.compression, "lz4");
}

#[test]
fn watcher_reloads_after_file_change() {
    let _env = ENV_LOCK.lock().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unified.yaml");
    fs::write(&path, "logger:\n  level: info\n").unwrap();

    let watcher = ConfigWatcher::new(&path);
    assert_eq!(watcher.version(), 1);
    assert_eq!(watcher.current().logger.level, "info");

    watcher.start().unwrap();
    fs::write(&path, "logger:\n  level: debug\n").unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while watcher.version() == 1 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(50));
    }

    assert!(watcher.version() > 1, "watcher never picked up the change");
    assert_eq!(watcher.current().logger.level, "debug");
    watcher.stop();
}

#[test]
fn watcher_rolls_back_to_earlier_version() {
    let _env = ENV_LOCK.lock().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("unified.yaml");
    fs::write(&path, "logger:\n  level: info\n").unwrap();

    let watcher = ConfigWatcher::new(&path);
    fs::write(&path, "logger:\n  level: warn\n").unwrap();
    watcher.reload().unwrap();
    assert_eq!(watcher.version(), 2);
    assert_eq!(watcher.current().logger.level, "warn");

    watcher.rollback(1).unwrap();
    assert_eq!(watcher.version(), 3);
    assert_eq!(watcher.current().logger.level, "info");
}
