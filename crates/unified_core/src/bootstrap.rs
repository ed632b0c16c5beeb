//! Application bootstrap: wires loggers into the registry, runs lifecycle
//! callbacks, and tears everything down in reverse.
//!
//! ```no_run
//! use std::sync::Arc;
//! use unified_core::bootstrap::SystemBootstrapper;
//! use unified_core::logger::NullLogger;
//!
//! let mut bootstrapper = SystemBootstrapper::new()
//!     .with_default_logger(Box::new(|| Arc::new(NullLogger)))
//!     .with_logger("database", Box::new(|| Arc::new(NullLogger)))
//!     .on_initialize(Box::new(|| tracing::info!("system started")))
//!     .on_shutdown(Box::new(|| tracing::info!("system stopped")));
//!
//! bootstrapper.initialize().unwrap();
//! // ... run ...
//! bootstrapper.shutdown();
//! ```

use crate::error_codes;
use crate::logger::registry::{LoggerFactory, LoggerRegistry};
use crate::logger::null_logger;
use crate::result::{err, UnitResult};

type LifecycleCallback = Box<dyn Fn() + Send + Sync>;

/// Fluent system bootstrapper.
///
/// Dropping an initialized bootstrapper shuts it down. Shutdown clears the
/// logger registry, including loggers registered outside this bootstrapper;
/// the bootstrapper owns the registry's lifecycle once initialized.
pub struct SystemBootstrapper {
    registry: &'static LoggerRegistry,
    default_logger_factory: Option<LoggerFactory>,
    named_logger_factories: Vec<(String, LoggerFactory)>,
    init_callbacks: Vec<LifecycleCallback>,
    shutdown_callbacks: Vec<LifecycleCallback>,
    set_default: bool,
    registered_names: Vec<String>,
    initialized: bool,
}

impl Default for SystemBootstrapper {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemBootstrapper {
    /// Bootstrapper over the global logger registry.
    pub fn new() -> Self {
        Self::with_registry(LoggerRegistry::global())
    }

    /// Bootstrapper over a specific registry.
    pub fn with_registry(registry: &'static LoggerRegistry) -> Self {
        Self {
            registry,
            default_logger_factory: None,
            named_logger_factories: Vec::new(),
            init_callbacks: Vec::new(),
            shutdown_callbacks: Vec::new(),
            set_default: false,
            registered_names: Vec::new(),
            initialized: false,
        }
    }

    /// Factory for the default logger, invoked during [`Self::initialize`].
    pub fn with_default_logger(mut self, factory: LoggerFactory) -> Self {
        self.default_logger_factory = Some(factory);
        self
    }

    /// Factory for a named logger. Re-using a name replaces the earlier
    /// factory.
    pub fn with_logger(mut self, name: &str, factory: LoggerFactory) -> Self {
        for entry in &mut self.named_logger_factories {
            if entry.0 == name {
                entry.1 = factory;
                return self;
            }
        }
        self.named_logger_factories.push((name.to_string(), factory));
        self
    }

    /// Callback invoked after all loggers are registered.
    pub fn on_initialize(mut self, callback: LifecycleCallback) -> Self {
        self.init_callbacks.push(callback);
        self
    }

    /// Callback invoked during shutdown, before loggers are removed.
    /// Callbacks run in reverse registration order.
    pub fn on_shutdown(mut self, callback: LifecycleCallback) -> Self {
        self.shutdown_callbacks.push(callback);
        self
    }

    /// Register all configured loggers and run the init callbacks.
    ///
    /// Fails with `ALREADY_EXISTS` when called twice. If any registration
    /// fails, loggers registered earlier in the same call are rolled back
    /// before the error is returned.
    pub fn initialize(&mut self) -> UnitResult {
        if self.initialized {
            return err(
                error_codes::common::ALREADY_EXISTS,
                "SystemBootstrapper already initialized",
                "bootstrap",
            );
        }

        self.register_loggers()?;

        for callback in &self.init_callbacks {
            callback();
        }
        self.initialized = true;
        Ok(())
    }

    /// Tear the system down: shutdown callbacks in reverse order, then a
    /// clear of the logger registry. Idempotent; calling on an
    /// uninitialized bootstrapper is a no-op.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }

        for callback in self.shutdown_callbacks.iter().rev() {
            callback();
        }
        // Best effort: a frozen registry keeps its loggers.
        let _ = self.registry.clear();
        self.registered_names.clear();
        self.set_default = false;
        self.initialized = false;
    }

    /// Shut down if initialized and drop all configuration.
    pub fn reset(&mut self) {
        self.shutdown();
        self.default_logger_factory = None;
        self.named_logger_factories.clear();
        self.init_callbacks.clear();
        self.shutdown_callbacks.clear();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn register_loggers(&mut self) -> UnitResult {
        if let Some(factory) = &self.default_logger_factory {
            let logger = factory();
            self.registry.set_default_logger(logger)?;
            self.set_default = true;
        }

        for i in 0..self.named_logger_factories.len() {
            let (name, logger) = {
                let (name, factory) = &self.named_logger_factories[i];
                (name.clone(), factory())
            };
            if let Err(e) = self.registry.register_logger(&name, logger) {
                self.remove_registered_loggers();
                return Err(e);
            }
            self.registered_names.push(name);
        }
        Ok(())
    }

    fn remove_registered_loggers(&mut self) {
        for name in self.registered_names.drain(..).rev() {
            // Best effort: the registry may have been frozen meanwhile.
            let _ = self.registry.unregister_logger(&name);
        }
        if self.set_default {
            let _ = self.registry.set_default_logger(null_logger());
            self.set_default = false;
        }
    }
}

impl Drop for SystemBootstrapper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::logger::NullLogger;

    fn fresh_registry() -> &'static LoggerRegistry {
        Box::leak(Box::new(LoggerRegistry::new()))
    }

    #[test]
    fn test_initialize_registers_loggers() {
        let registry = fresh_registry();
        let mut boot = SystemBootstrapper::with_registry(registry)
            .with_default_logger(Box::new(|| Arc::new(NullLogger)))
            .with_logger("database", Box::new(|| Arc::new(NullLogger)))
            .with_logger("network", Box::new(|| Arc::new(NullLogger)));

        boot.initialize().unwrap();
        assert!(boot.is_initialized());
        assert!(registry.has_default_logger());
        assert!(registry.has_logger("database"));
        assert!(registry.has_logger("network"));
    }

    #[test]
    fn test_double_initialize_rejected() {
        let mut boot = SystemBootstrapper::with_registry(fresh_registry());
        boot.initialize().unwrap();
        let e = boot.initialize().unwrap_err();
        assert_eq!(e.code, error_codes::common::ALREADY_EXISTS);
    }

    #[test]
    fn test_callbacks_run_in_order() {
        static INIT_ORDER: AtomicUsize = AtomicUsize::new(0);
        static SHUTDOWN_ORDER: AtomicUsize = AtomicUsize::new(0);

        let mut boot = SystemBootstrapper::with_registry(fresh_registry())
            .on_initialize(Box::new(|| {
                assert_eq!(INIT_ORDER.fetch_add(1, Ordering::SeqCst), 0);
            }))
            .on_initialize(Box::new(|| {
                assert_eq!(INIT_ORDER.fetch_add(1, Ordering::SeqCst), 1);
            }))
            .on_shutdown(Box::new(|| {
                // Registered first, runs last.
                assert_eq!(SHUTDOWN_ORDER.fetch_add(1, Ordering::SeqCst), 1);
            }))
            .on_shutdown(Box::new(|| {
                assert_eq!(SHUTDOWN_ORDER.fetch_add(1, Ordering::SeqCst), 0);
            }));

        boot.initialize().unwrap();
        boot.shutdown();
        assert_eq!(INIT_ORDER.load(Ordering::SeqCst), 2);
        assert_eq!(SHUTDOWN_ORDER.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_shutdown_idempotent_and_removes_loggers() {
        static SHUTDOWNS: AtomicUsize = AtomicUsize::new(0);

        let registry = fresh_registry();
        let mut boot = SystemBootstrapper::with_registry(registry)
            .with_logger("app", Box::new(|| Arc::new(NullLogger)))
            .on_shutdown(Box::new(|| {
                SHUTDOWNS.fetch_add(1, Ordering::SeqCst);
            }));

        boot.initialize().unwrap();
        assert!(registry.has_logger("app"));

        boot.shutdown();
        boot.shutdown();
        assert_eq!(SHUTDOWNS.load(Ordering::SeqCst), 1);
        assert!(!registry.has_logger("app"));
        assert!(!boot.is_initialized());
    }

    #[test]
    fn test_shutdown_clears_entire_registry() {
        let registry = fresh_registry();
        registry
            .register_logger("external", Arc::new(NullLogger))
            .unwrap();

        let mut boot = SystemBootstrapper::with_registry(registry)
            .with_default_logger(Box::new(|| Arc::new(NullLogger)))
            .with_logger("app", Box::new(|| Arc::new(NullLogger)));
        boot.initialize().unwrap();

        boot.shutdown();
        assert!(!registry.has_logger("app"));
        assert!(!registry.has_logger("external"));
        assert!(!registry.has_default_logger());
        assert_eq!(registry.size(), 0);
    }

    #[test]
    fn test_failed_registration_rolls_back() {
        let registry = fresh_registry();
        registry.freeze();

        let mut boot = SystemBootstrapper::with_registry(registry)
            .with_logger("app", Box::new(|| Arc::new(NullLogger)));
        let e = boot.initialize().unwrap_err();
        assert_eq!(e.code, error_codes::common::REGISTRY_FROZEN);
        assert!(!boot.is_initialized());
    }

    #[test]
    fn test_drop_shuts_down() {
        let registry = fresh_registry();
        {
            let mut boot = SystemBootstrapper::with_registry(registry)
                .with_logger("scoped", Box::new(|| Arc::new(NullLogger)));
            boot.initialize().unwrap();
            assert!(registry.has_logger("scoped"));
        }
        assert!(!registry.has_logger("scoped"));
    }

    #[test]
    fn test_replacing_named_factory() {
        let registry = fresh_registry();
        let mut boot = SystemBootstrapper::with_registry(registry)
            .with_logger("app", Box::new(|| Arc::new(NullLogger)))
            .with_logger("app", Box::new(|| Arc::new(NullLogger)));
        boot.initialize().unwrap();
        assert_eq!(registry.size(), 1);
    }
}
