//! Configuration hot-reload: file watching, change events, version history,
//! and rollback.
//!
//! The watcher keeps the current [`UnifiedConfig`] behind a read-write lock
//! and reloads it when the file changes on disk. Reloads that fail to parse
//! or validate leave the current configuration untouched and are recorded as
//! failed events. Every accepted configuration lands in a bounded version
//! history that [`ConfigWatcher::rollback`] can restore from.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::{DateTime, Utc};
use notify::{RecursiveMode, Watcher};

use crate::error_codes::{config as loader_codes, watcher as codes};
use crate::result::{err, try_catch_unit, UnitResult};

use super::loader::ConfigLoader;
use super::schema::{is_hot_reloadable, UnifiedConfig};

/// How long the watch thread waits for file events before re-checking the
/// running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Delay between noticing a change and reloading, so in-progress writes can
/// finish.
const DEBOUNCE_DELAY: Duration = Duration::from_millis(100);

const MAX_EVENTS: usize = 100;
const DEFAULT_MAX_HISTORY: usize = 10;

/// One reload attempt, successful or not.
#[derive(Debug, Clone)]
pub struct ConfigChangeEvent {
    pub timestamp: DateTime<Utc>,
    pub version: u64,
    pub success: bool,
    /// Empty on success.
    pub error_message: String,
    pub changed_fields: Vec<String>,
}

/// A configuration version kept in history.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub version: u64,
    pub timestamp: DateTime<Utc>,
    pub config: UnifiedConfig,
}

type ChangeCallback = Box<dyn Fn(&UnifiedConfig, &UnifiedConfig) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

struct WatcherShared {
    config_path: PathBuf,
    current: RwLock<UnifiedConfig>,
    version: AtomicU64,
    max_history: usize,
    history: Mutex<VecDeque<ConfigSnapshot>>,
    events: Mutex<VecDeque<ConfigChangeEvent>>,
    change_callbacks: Mutex<Vec<ChangeCallback>>,
    error_callbacks: Mutex<Vec<ErrorCallback>>,
    running: AtomicBool,
}

/// Watches one configuration file and hot-reloads it.
///
/// Not cloneable; share it behind an `Arc` when multiple owners need it.
/// Dropping the watcher stops the watch thread.
pub struct ConfigWatcher {
    shared: Arc<WatcherShared>,
    fs_watcher: Mutex<Option<notify::RecommendedWatcher>>,
    watch_thread: Mutex<Option<JoinHandle<()>>>,
}

impl ConfigWatcher {
    /// Watcher with the default history depth.
    ///
    /// The initial configuration is loaded from the file; if that fails,
    /// defaults are used and the first reload can recover.
    pub fn new(config_path: impl AsRef<Path>) -> Self {
        Self::with_max_history(config_path, DEFAULT_MAX_HISTORY)
    }

    /// Watcher keeping at most `max_history` snapshots.
    pub fn with_max_history(config_path: impl AsRef<Path>, max_history: usize) -> Self {
        let config_path = config_path.as_ref().to_path_buf();
        let initial = match ConfigLoader::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    path = %config_path.display(),
                    error = %e,
                    "initial configuration load failed, using defaults"
                );
                UnifiedConfig::defaults()
            }
        };

        let shared = Arc::new(WatcherShared {
            config_path,
            current: RwLock::new(initial.clone()),
            version: AtomicU64::new(1),
            max_history,
            history: Mutex::new(VecDeque::new()),
            events: Mutex::new(VecDeque::new()),
            change_callbacks: Mutex::new(Vec::new()),
            error_callbacks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        });
        shared.add_to_history(initial);

        Self {
            shared,
            fs_watcher: Mutex::new(None),
            watch_thread: Mutex::new(None),
        }
    }

    /// Start the background watch thread.
    pub fn start(&self) -> UnitResult {
        if self.shared.running.swap(true, Ordering::AcqRel) {
            return err(
                codes::ALREADY_RUNNING,
                "Config watcher is already running",
                "config_watcher",
            );
        }

        let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
        let mut fs_watcher = match notify::recommended_watcher(tx) {
            Ok(w) => w,
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                return err(
                    codes::WATCH_FAILED,
                    format!("Failed to create file watcher: {e}"),
                    "config_watcher",
                );
            }
        };

        // Watch the parent directory so editors that replace the file
        // (write-to-temp then rename) are still observed.
        let watch_dir = self
            .shared
            .config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        if let Err(e) = fs_watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
            self.shared.running.store(false, Ordering::Release);
            return err(
                codes::WATCH_FAILED,
                format!("Failed to watch {}: {e}", watch_dir.display()),
                "config_watcher",
            );
        }

        let shared = self.shared.clone();
        let handle = std::thread::Builder::new()
            .name("config-watcher".to_string())
            .spawn(move || watch_loop(shared, rx))
            .map_err(|e| {
                self.shared.running.store(false, Ordering::Release);
                crate::error::ErrorInfo::new(
                    codes::WATCH_FAILED,
                    format!("Failed to spawn watch thread: {e}"),
                    "config_watcher",
                )
            })?;

        *lock_ignore_poison(&self.fs_watcher) = Some(fs_watcher);
        *lock_ignore_poison(&self.watch_thread) = Some(handle);
        Ok(())
    }

    /// Stop the watch thread and wait for it to exit. Idempotent.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        // Dropping the notify watcher closes the event channel, which wakes
        // the thread out of its receive wait.
        lock_ignore_poison(&self.fs_watcher).take();
        if let Some(handle) = lock_ignore_poison(&self.watch_thread).take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Register a callback invoked with (old, new) on every accepted
    /// change, including rollbacks.
    pub fn on_change(&self, callback: ChangeCallback) {
        lock_ignore_poison(&self.shared.change_callbacks).push(callback);
    }

    /// Register a callback invoked with the error message when a reload
    /// attempt fails.
    pub fn on_error(&self, callback: ErrorCallback) {
        lock_ignore_poison(&self.shared.error_callbacks).push(callback);
    }

    /// Manually trigger a reload, using the same path as file events.
    pub fn reload(&self) -> UnitResult {
        self.shared.do_reload()
    }

    /// The active configuration.
    pub fn current(&self) -> UnifiedConfig {
        self.shared
            .current
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Monotonic version counter; starts at 1 and increments on every
    /// accepted change.
    pub fn version(&self) -> u64 {
        self.shared.version.load(Ordering::Acquire)
    }

    /// Snapshots, newest first. `count == 0` returns everything.
    pub fn history(&self, count: usize) -> Vec<ConfigSnapshot> {
        let history = lock_ignore_poison(&self.shared.history);
        let take = if count == 0 { history.len() } else { count };
        history.iter().rev().take(take).cloned().collect()
    }

    /// Restore a configuration from history by version number.
    pub fn rollback(&self, target_version: u64) -> UnitResult {
        let snapshot = {
            let history = lock_ignore_poison(&self.shared.history);
            history
                .iter()
                .find(|s| s.version == target_version)
                .cloned()
        };
        let Some(snapshot) = snapshot else {
            return err(
                codes::ROLLBACK_FAILED,
                format!("Target version not found in history: {target_version}"),
                "config_watcher",
            );
        };

        let old_config = {
            let mut current = self.shared.current.write().map_err(|_| {
                crate::error::ErrorInfo::new(
                    codes::ROLLBACK_FAILED,
                    "configuration lock poisoned",
                    "config_watcher",
                )
            })?;
            let old = current.clone();
            *current = snapshot.config.clone();
            old
        };
        self.shared.version.fetch_add(1, Ordering::AcqRel);
        self.shared.notify_change(&old_config, &snapshot.config);
        Ok(())
    }

    /// Recent reload events, newest first. `count == 0` returns everything.
    pub fn recent_events(&self, count: usize) -> Vec<ConfigChangeEvent> {
        let events = lock_ignore_poison(&self.shared.events);
        let take = if count == 0 { events.len() } else { count };
        events.iter().rev().take(take).cloned().collect()
    }

    pub fn config_path(&self) -> &Path {
        &self.shared.config_path
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_loop(shared: Arc<WatcherShared>, rx: mpsc::Receiver<notify::Result<notify::Event>>) {
    let filename = shared.config_path.file_name().map(|n| n.to_os_string());

    while shared.running.load(Ordering::Acquire) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(event)) => {
                let relevant = matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Modify(_)
                ) && event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == filename);
                if relevant {
                    std::thread::sleep(DEBOUNCE_DELAY);
                    let _ = shared.do_reload();
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "file watch error");
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn lock_ignore_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl WatcherShared {
    fn do_reload(&self) -> UnitResult {
        // A failed reload leaves the version untouched, so the event starts
        // at the current version and is bumped only on success.
        let mut event = ConfigChangeEvent {
            timestamp: Utc::now(),
            version: self.version.load(Ordering::Acquire),
            success: false,
            error_message: String::new(),
            changed_fields: Vec::new(),
        };

        let new_config = match ConfigLoader::load(&self.config_path) {
            Ok(config) => config,
            Err(e) => {
                event.error_message = e.message.clone();
                self.add_event(event);
                if e.code == loader_codes::VALIDATION_ERROR {
                    self.notify_error(&format!("Validation failed: {}", e.message));
                    return err(
                        codes::VALIDATION_FAILED,
                        format!("Configuration validation failed: {}", e.message),
                        "config_watcher",
                    );
                }
                self.notify_error(&e.message);
                return err(
                    codes::RELOAD_FAILED,
                    format!("Configuration reload failed: {}", e.message),
                    "config_watcher",
                );
            }
        };

        let old_config = {
            let mut current = self.current.write().map_err(|_| {
                crate::error::ErrorInfo::new(
                    codes::RELOAD_FAILED,
                    "configuration lock poisoned",
                    "config_watcher",
                )
            })?;
            event.changed_fields = current.changed_paths(&new_config);
            let old = current.clone();
            *current = new_config.clone();
            old
        };

        for field in &event.changed_fields {
            if !is_hot_reloadable(field) {
                tracing::warn!(
                    field = %field,
                    "changed field is not hot-reloadable; restart required to take effect"
                );
            }
        }

        self.version.fetch_add(1, Ordering::AcqRel);
        event.version = self.version.load(Ordering::Acquire);
        event.success = true;
        self.add_to_history(new_config.clone());
        self.add_event(event);
        self.notify_change(&old_config, &new_config);
        Ok(())
    }

    fn add_to_history(&self, config: UnifiedConfig) {
        let mut history = lock_ignore_poison(&self.history);
        history.push_back(ConfigSnapshot {
            version: self.version.load(Ordering::Acquire),
            timestamp: Utc::now(),
            config,
        });
        while history.len() > self.max_history {
            history.pop_front();
        }
    }

    fn add_event(&self, event: ConfigChangeEvent) {
        let mut events = lock_ignore_poison(&self.events);
        events.push_back(event);
        while events.len() > MAX_EVENTS {
            events.pop_front();
        }
    }

    fn notify_change(&self, old_config: &UnifiedConfig, new_config: &UnifiedConfig) {
        let callbacks = lock_ignore_poison(&self.change_callbacks);
        for callback in callbacks.iter() {
            // Callback panics must not take down the watch thread.
            let _ = try_catch_unit("config_watcher", || callback(old_config, new_config));
        }
    }

    fn notify_error(&self, message: &str) {
        let callbacks = lock_ignore_poison(&self.error_callbacks);
        for callback in callbacks.iter() {
            let _ = try_catch_unit("config_watcher", || callback(message));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn write_config(path: &Path, level: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "unified_system:").unwrap();
        writeln!(file, "  logger:").unwrap();
        writeln!(file, "    level: {level}").unwrap();
        file.sync_all().unwrap();
    }

    #[test]
    fn test_initial_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.yaml");
        write_config(&path, "debug");

        let watcher = ConfigWatcher::new(&path);
        assert_eq!(watcher.current().logger.level, "debug");
        assert_eq!(watcher.version(), 1);
        assert_eq!(watcher.history(0).len(), 1);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = ConfigWatcher::new(dir.path().join("absent.yaml"));
        assert_eq!(watcher.current().logger.level, "info");
    }

    #[test]
    fn test_manual_reload_applies_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.yaml");
        write_config(&path, "info");

        let watcher = ConfigWatcher::new(&path);
        let changes = Arc::new(AtomicUsize::new(0));
        let seen = changes.clone();
        watcher.on_change(Box::new(move |old, new| {
            assert_eq!(old.logger.level, "info");
            assert_eq!(new.logger.level, "error");
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        write_config(&path, "error");
        watcher.reload().unwrap();

        assert_eq!(watcher.current().logger.level, "error");
        assert_eq!(watcher.version(), 2);
        assert_eq!(changes.load(Ordering::SeqCst), 1);

        let events = watcher.recent_events(1);
        assert!(events[0].success);
        assert_eq!(events[0].changed_fields, ["logger.level"]);
    }

    #[test]
    fn test_invalid_reload_keeps_current_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.yaml");
        write_config(&path, "info");

        let watcher = ConfigWatcher::new(&path);
        let errors = Arc::new(AtomicUsize::new(0));
        let seen = errors.clone();
        watcher.on_error(Box::new(move |_message| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        write_config(&path, "verbose");
        let e = watcher.reload().unwrap_err();
        assert_eq!(e.code, codes::VALIDATION_FAILED);

        assert_eq!(watcher.current().logger.level, "info");
        assert_eq!(watcher.version(), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        let events = watcher.recent_events(1);
        assert!(!events[0].success);
        assert!(!events[0].error_message.is_empty());
        // The event names the version that stayed in effect, not one that
        // was never assigned.
        assert_eq!(events[0].version, 1);
    }

    #[test]
    fn test_rollback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.yaml");
        write_config(&path, "info");

        let watcher = ConfigWatcher::new(&path);
        write_config(&path, "error");
        watcher.reload().unwrap();
        assert_eq!(watcher.current().logger.level, "error");

        watcher.rollback(1).unwrap();
        assert_eq!(watcher.current().logger.level, "info");
        assert_eq!(watcher.version(), 3);

        let e = watcher.rollback(999).unwrap_err();
        assert_eq!(e.code, codes::ROLLBACK_FAILED);
    }

    #[test]
    fn test_history_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.yaml");
        write_config(&path, "info");

        let watcher = ConfigWatcher::with_max_history(&path, 3);
        for level in ["debug", "warn", "error", "trace", "critical"] {
            write_config(&path, level);
            watcher.reload().unwrap();
        }
        let history = watcher.history(0);
        assert_eq!(history.len(), 3);
        // Newest first.
        assert_eq!(history[0].config.logger.level, "critical");
        assert!(history[0].version > history[1].version);
    }

    #[test]
    fn test_start_stop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unified.yaml");
        write_config(&path, "info");

        let watcher = ConfigWatcher::new(&path);
        watcher.start().unwrap();
        assert!(watcher.is_running());
        let e = watcher.start().unwrap_err();
        assert_eq!(e.code, codes::ALREADY_RUNNING);

        watcher.stop();
        assert!(!watcher.is_running());
        watcher.stop();
    }
}
