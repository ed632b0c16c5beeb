//! Global logger registry with named loggers, lazy factories, and freeze.
//!
//! Loggers can be registered eagerly or as factories that instantiate on
//! first lookup. Lookups never fail: unknown names fall back to the shared
//! [`NullLogger`](super::NullLogger). Once frozen, all mutations are
//! rejected; every mutation (accepted or rejected) is recorded in the
//! [`AuditLog`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::error_codes;
use crate::result::{err, UnitResult};

use super::{null_logger, Logger};

/// Creates a logger on first lookup.
pub type LoggerFactory = Box<dyn Fn() -> Arc<dyn Logger> + Send + Sync>;

#[derive(Default)]
struct Inner {
    loggers: HashMap<String, Arc<dyn Logger>>,
    factories: HashMap<String, LoggerFactory>,
    default_logger: Option<Arc<dyn Logger>>,
    default_factory: Option<LoggerFactory>,
}

/// Thread-safe registry of named loggers plus a default slot.
pub struct LoggerRegistry {
    inner: RwLock<Inner>,
    frozen: AtomicBool,
}

static GLOBAL: Lazy<LoggerRegistry> = Lazy::new(LoggerRegistry::new);

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            frozen: AtomicBool::new(false),
        }
    }

    /// Process-wide registry instance.
    pub fn global() -> &'static LoggerRegistry {
        &GLOBAL
    }

    fn frozen_error(&self, action: AuditAction, target: &str) -> UnitResult {
        AuditLog::log_event(AuditEvent::failed(action, target, "registry is frozen"));
        err(
            error_codes::common::REGISTRY_FROZEN,
            "Registry is frozen",
            "logger_registry",
        )
    }

    /// Register a logger under a name, replacing any existing logger and
    /// discarding any pending factory for that name.
    #[track_caller]
    pub fn register_logger(&self, name: &str, logger: Arc<dyn Logger>) -> UnitResult {
        if self.is_frozen() {
            return self.frozen_error(AuditAction::RegisterLogger, name);
        }
        let mut inner = self.write_lock()?;
        inner.factories.remove(name);
        inner.loggers.insert(name.to_string(), logger);
        AuditLog::log_event(AuditEvent::new(AuditAction::RegisterLogger, name));
        Ok(())
    }

    /// Register a factory that creates the logger on first lookup. Fails if
    /// a logger is already registered under the name.
    #[track_caller]
    pub fn register_factory(&self, name: &str, factory: LoggerFactory) -> UnitResult {
        if self.is_frozen() {
            return self.frozen_error(AuditAction::RegisterFactory, name);
        }
        let mut inner = self.write_lock()?;
        if inner.loggers.contains_key(name) {
            AuditLog::log_event(AuditEvent::failed(
                AuditAction::RegisterFactory,
                name,
                "logger already registered",
            ));
            return err(
                error_codes::common::ALREADY_EXISTS,
                format!("logger already registered: {name}"),
                "logger_registry",
            );
        }
        inner.factories.insert(name.to_string(), factory);
        AuditLog::log_event(AuditEvent::new(AuditAction::RegisterFactory, name));
        Ok(())
    }

    #[track_caller]
    pub fn set_default_logger(&self, logger: Arc<dyn Logger>) -> UnitResult {
        if self.is_frozen() {
            return self.frozen_error(AuditAction::SetDefaultLogger, "");
        }
        let mut inner = self.write_lock()?;
        inner.default_factory = None;
        inner.default_logger = Some(logger);
        AuditLog::log_event(AuditEvent::new(AuditAction::SetDefaultLogger, ""));
        Ok(())
    }

    #[track_caller]
    pub fn set_default_factory(&self, factory: LoggerFactory) -> UnitResult {
        if self.is_frozen() {
            return self.frozen_error(AuditAction::SetDefaultFactory, "");
        }
        let mut inner = self.write_lock()?;
        if inner.default_logger.is_some() {
            AuditLog::log_event(AuditEvent::failed(
                AuditAction::SetDefaultFactory,
                "",
                "default logger already set",
            ));
            return err(
                error_codes::common::ALREADY_EXISTS,
                "default logger already set",
                "logger_registry",
            );
        }
        inner.default_factory = Some(factory);
        AuditLog::log_event(AuditEvent::new(AuditAction::SetDefaultFactory, ""));
        Ok(())
    }

    /// Look up a named logger, instantiating a registered factory on first
    /// use. Unknown names return the shared null logger.
    pub fn logger(&self, name: &str) -> Arc<dyn Logger> {
        if let Ok(inner) = self.inner.read() {
            if let Some(logger) = inner.loggers.get(name) {
                return logger.clone();
            }
            if !inner.factories.contains_key(name) {
                return null_logger();
            }
        } else {
            return null_logger();
        }

        // Slow path: materialize the factory under the write lock, with a
        // re-check in case another thread won the race.
        let Ok(mut inner) = self.inner.write() else {
            return null_logger();
        };
        if let Some(logger) = inner.loggers.get(name) {
            return logger.clone();
        }
        match inner.factories.remove(name) {
            Some(factory) => {
                let logger = factory();
                inner.loggers.insert(name.to_string(), logger.clone());
                logger
            }
            None => null_logger(),
        }
    }

    /// The default logger, instantiating a default factory on first use.
    /// Falls back to the shared null logger.
    pub fn default_logger(&self) -> Arc<dyn Logger> {
        if let Ok(inner) = self.inner.read() {
            if let Some(logger) = &inner.default_logger {
                return logger.clone();
            }
            if inner.default_factory.is_none() {
                return null_logger();
            }
        } else {
            return null_logger();
        }

        let Ok(mut inner) = self.inner.write() else {
            return null_logger();
        };
        if let Some(logger) = &inner.default_logger {
            return logger.clone();
        }
        match inner.default_factory.take() {
            Some(factory) => {
                let logger = factory();
                inner.default_logger = Some(logger.clone());
                logger
            }
            None => null_logger(),
        }
    }

    /// Remove a named logger and any pending factory. Idempotent.
    #[track_caller]
    pub fn unregister_logger(&self, name: &str) -> UnitResult {
        if self.is_frozen() {
            return self.frozen_error(AuditAction::UnregisterLogger, name);
        }
        let mut inner = self.write_lock()?;
        inner.loggers.remove(name);
        inner.factories.remove(name);
        AuditLog::log_event(AuditEvent::new(AuditAction::UnregisterLogger, name));
        Ok(())
    }

    /// Remove all loggers, factories, and the default slot.
    #[track_caller]
    pub fn clear(&self) -> UnitResult {
        if self.is_frozen() {
            return self.frozen_error(AuditAction::ClearLoggers, "");
        }
        let mut inner = self.write_lock()?;
        inner.loggers.clear();
        inner.factories.clear();
        inner.default_logger = None;
        inner.default_factory = None;
        AuditLog::log_event(AuditEvent::new(AuditAction::ClearLoggers, ""));
        Ok(())
    }

    /// Permanently reject further mutations. Irreversible.
    #[track_caller]
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
        AuditLog::log_event(AuditEvent::new(AuditAction::FreezeLoggerRegistry, ""));
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn has_logger(&self, name: &str) -> bool {
        self.inner
            .read()
            .map(|i| i.loggers.contains_key(name) || i.factories.contains_key(name))
            .unwrap_or(false)
    }

    pub fn has_default_logger(&self) -> bool {
        self.inner
            .read()
            .map(|i| i.default_logger.is_some() || i.default_factory.is_some())
            .unwrap_or(false)
    }

    /// Number of registered names, counting pending factories.
    pub fn size(&self) -> usize {
        self.inner
            .read()
            .map(|i| i.loggers.len() + i.factories.len())
            .unwrap_or(0)
    }

    fn write_lock(&self) -> crate::result::Result<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner.write().map_err(|_| {
            crate::error::ErrorInfo::new(
                error_codes::common::INTERNAL_ERROR,
                "logger registry lock poisoned",
                "logger_registry",
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::logger::LogLevel;
    use crate::result::UnitResult;

    struct RecordingLogger {
        level: Mutex<LogLevel>,
        lines: Mutex<Vec<String>>,
    }

    impl RecordingLogger {
        fn new() -> Self {
            Self {
                level: Mutex::new(LogLevel::Trace),
                lines: Mutex::new(Vec::new()),
            }
        }
    }

    impl Logger for RecordingLogger {
        fn log(&self, level: LogLevel, message: &str) -> UnitResult {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{level} {message}"));
            Ok(())
        }

        fn set_level(&self, level: LogLevel) {
            *self.level.lock().unwrap() = level;
        }

        fn get_level(&self) -> LogLevel {
            *self.level.lock().unwrap()
        }

        fn flush(&self) -> UnitResult {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = LoggerRegistry::new();
        let logger = Arc::new(RecordingLogger::new());
        registry.register_logger("app", logger.clone()).unwrap();

        assert!(registry.has_logger("app"));
        assert_eq!(registry.size(), 1);
        registry
            .logger("app")
            .log(LogLevel::Info, "hello")
            .unwrap();
        assert_eq!(logger.lines.lock().unwrap().as_slice(), ["info hello"]);
    }

    #[test]
    fn test_unknown_name_falls_back_to_null() {
        let registry = LoggerRegistry::new();
        let logger = registry.logger("nope");
        assert!(!logger.is_enabled(LogLevel::Critical));
    }

    #[test]
    fn test_factory_instantiates_once() {
        let registry = LoggerRegistry::new();
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        registry
            .register_factory(
                "lazy",
                Box::new(|| {
                    CALLS.fetch_add(1, Ordering::SeqCst);
                    Arc::new(RecordingLogger::new())
                }),
            )
            .unwrap();

        assert!(registry.has_logger("lazy"));
        let a = registry.logger("lazy");
        let b = registry.logger("lazy");
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_factory_rejected_when_logger_present() {
        let registry = LoggerRegistry::new();
        registry
            .register_logger("app", Arc::new(RecordingLogger::new()))
            .unwrap();
        let result =
            registry.register_factory("app", Box::new(|| Arc::new(RecordingLogger::new())));
        assert_eq!(
            result.unwrap_err().code,
            error_codes::common::ALREADY_EXISTS
        );
    }

    #[test]
    fn test_register_replaces_and_drops_factory() {
        let registry = LoggerRegistry::new();
        registry
            .register_factory("app", Box::new(|| Arc::new(RecordingLogger::new())))
            .unwrap();
        let eager = Arc::new(RecordingLogger::new());
        registry.register_logger("app", eager.clone()).unwrap();
        assert_eq!(registry.size(), 1);

        let looked_up = registry.logger("app");
        looked_up.log(LogLevel::Debug, "x").unwrap();
        assert_eq!(eager.lines.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_default_logger_lazy() {
        let registry = LoggerRegistry::new();
        assert!(!registry.has_default_logger());
        assert!(!registry.default_logger().is_enabled(LogLevel::Critical));

        registry
            .set_default_factory(Box::new(|| Arc::new(RecordingLogger::new())))
            .unwrap();
        assert!(registry.has_default_logger());
        let a = registry.default_logger();
        let b = registry.default_logger();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_freeze_blocks_mutations() {
        let registry = LoggerRegistry::new();
        registry
            .register_logger("kept", Arc::new(RecordingLogger::new()))
            .unwrap();
        registry.freeze();
        assert!(registry.is_frozen());

        let result = registry.register_logger("new", Arc::new(RecordingLogger::new()));
        assert_eq!(
            result.unwrap_err().code,
            error_codes::common::REGISTRY_FROZEN
        );
        assert!(registry.clear().is_err());
        assert!(registry.unregister_logger("kept").is_err());
        // Lookups still work after freeze.
        assert!(registry.has_logger("kept"));
    }

    #[test]
    fn test_unregister_idempotent() {
        let registry = LoggerRegistry::new();
        assert!(registry.unregister_logger("ghost").is_ok());
        registry
            .register_logger("app", Arc::new(RecordingLogger::new()))
            .unwrap();
        assert!(registry.unregister_logger("app").is_ok());
        assert!(!registry.has_logger("app"));
        assert!(registry.unregister_logger("app").is_ok());
    }

    #[test]
    fn test_clear_resets_everything() {
        let registry = LoggerRegistry::new();
        registry
            .register_logger("a", Arc::new(RecordingLogger::new()))
            .unwrap();
        registry
            .register_factory("b", Box::new(|| Arc::new(RecordingLogger::new())))
            .unwrap();
        registry
            .set_default_logger(Arc::new(RecordingLogger::new()))
            .unwrap();

        registry.clear().unwrap();
        assert_eq!(registry.size(), 0);
        assert!(!registry.has_default_logger());
    }
}
