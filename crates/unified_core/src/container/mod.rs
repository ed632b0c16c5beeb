//! Dependency-injection container with lifetimes, scopes, cycle detection,
//! and freeze.
//!
//! Services are keyed by their Rust type. Three lifetimes are supported:
//! singletons (one instance per container, created lazily), transients (a
//! fresh instance per resolve), and scoped services (one instance per
//! [`ServiceScope`](scope::ServiceScope)). Resolution tracks a per-thread
//! stack of in-flight types so circular dependencies fail with the full
//! chain instead of deadlocking or overflowing the stack.

pub mod scope;

pub use scope::ServiceScope;

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::Lazy;

use crate::audit::{AuditAction, AuditEvent, AuditLog};
use crate::error::ErrorInfo;
use crate::error_codes::{self, di};
use crate::result::{err, err_with_details, Result, UnitResult};

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceLifetime {
    /// One shared instance per container, created on first resolve.
    Singleton,
    /// A fresh instance on every resolve.
    Transient,
    /// One shared instance per scope; cannot be resolved from the root.
    Scoped,
}

impl ServiceLifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceLifetime::Singleton => "singleton",
            ServiceLifetime::Transient => "transient",
            ServiceLifetime::Scoped => "scoped",
        }
    }
}

/// Type-erased service instance.
pub type AnyService = Arc<dyn Any + Send + Sync>;

pub(crate) type ErasedFactory = Arc<dyn Fn() -> Result<AnyService> + Send + Sync>;

/// Registration metadata for one service type.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub type_name: &'static str,
    pub lifetime: ServiceLifetime,
    /// Whether a singleton instance has been materialized yet. Pre-built
    /// instances start true; factories flip it on first resolve.
    pub is_instantiated: bool,
    pub description: String,
}

impl ServiceDescriptor {
    fn new(type_name: &'static str, lifetime: ServiceLifetime, is_instantiated: bool) -> Self {
        Self {
            type_name,
            lifetime,
            is_instantiated,
            description: format!("{} {}", lifetime.as_str(), type_name),
        }
    }
}

struct ServiceEntry {
    descriptor: ServiceDescriptor,
    factory: Option<ErasedFactory>,
    /// Cached instance: pre-set for `register_instance`, filled on first
    /// resolve for singletons, always `None` for transient and scoped.
    instance: Option<AnyService>,
    /// Serializes first-time singleton creation so the factory runs at most
    /// once per entry across threads.
    creation: Arc<Mutex<()>>,
}

thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<(TypeId, &'static str)>> = RefCell::new(Vec::new());
}

/// Pops the resolution stack when the resolve attempt ends, including by
/// panic.
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(id: TypeId, type_name: &'static str) -> Result<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|(t, _)| *t == id) {
                let mut chain: Vec<&str> = stack.iter().map(|(_, n)| *n).collect();
                chain.push(type_name);
                return err_with_details(
                    di::CIRCULAR_DEPENDENCY,
                    "Circular dependency detected",
                    "service_container",
                    chain.join(" -> "),
                );
            }
            stack.push((id, type_name));
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Thread-safe service container. Cloneable handles are not provided; share
/// the container itself behind an `Arc` or use [`ServiceContainer::global`].
pub struct ServiceContainer {
    services: RwLock<HashMap<TypeId, ServiceEntry>>,
    frozen: AtomicBool,
}

static GLOBAL: Lazy<ServiceContainer> = Lazy::new(ServiceContainer::new);

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceContainer {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            frozen: AtomicBool::new(false),
        }
    }

    /// Process-wide container instance.
    pub fn global() -> &'static ServiceContainer {
        &GLOBAL
    }

    /// Register a type with a `Default` construction, usually as a
    /// singleton.
    #[track_caller]
    pub fn register_type<T>(&self, lifetime: ServiceLifetime) -> UnitResult
    where
        T: Default + Send + Sync + 'static,
    {
        self.register_factory::<T, _>(lifetime, || Ok(Arc::new(T::default())))
    }

    /// Register a pre-built instance as a singleton.
    #[track_caller]
    pub fn register_instance<T>(&self, instance: Arc<T>) -> UnitResult
    where
        T: Send + Sync + 'static,
    {
        let descriptor =
            ServiceDescriptor::new(std::any::type_name::<T>(), ServiceLifetime::Singleton, true);
        self.insert_entry::<T>(ServiceEntry {
            descriptor,
            factory: None,
            instance: Some(instance as AnyService),
            creation: Arc::new(Mutex::new(())),
        })
    }

    /// Register a factory with an explicit lifetime.
    #[track_caller]
    pub fn register_factory<T, F>(&self, lifetime: ServiceLifetime, factory: F) -> UnitResult
    where
        T: Send + Sync + 'static,
        F: Fn() -> Result<Arc<T>> + Send + Sync + 'static,
    {
        let descriptor = ServiceDescriptor::new(std::any::type_name::<T>(), lifetime, false);
        let erased: ErasedFactory = Arc::new(move || factory().map(|t| t as AnyService));
        self.insert_entry::<T>(ServiceEntry {
            descriptor,
            factory: Some(erased),
            instance: None,
            creation: Arc::new(Mutex::new(())),
        })
    }

    #[track_caller]
    fn insert_entry<T: 'static>(&self, entry: ServiceEntry) -> UnitResult {
        let type_name = entry.descriptor.type_name;
        if self.is_frozen() {
            AuditLog::log_event(AuditEvent::failed(
                AuditAction::RegisterService,
                type_name,
                "container is frozen",
            ));
            return err(
                error_codes::common::REGISTRY_FROZEN,
                "Registry is frozen",
                "service_container",
            );
        }
        let mut services = self.write_lock()?;
        if services.contains_key(&TypeId::of::<T>()) {
            AuditLog::log_event(AuditEvent::failed(
                AuditAction::RegisterService,
                type_name,
                "already registered",
            ));
            return err_with_details(
                di::ALREADY_REGISTERED,
                "Service already registered",
                "service_container",
                type_name,
            );
        }
        services.insert(TypeId::of::<T>(), entry);
        AuditLog::log_event(AuditEvent::new(AuditAction::RegisterService, type_name));
        Ok(())
    }

    /// Resolve a service from the root container.
    ///
    /// Scoped registrations cannot be resolved here; create a scope with
    /// [`ServiceContainer::create_scope`] first.
    pub fn resolve<T>(&self) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let _guard = ResolutionGuard::enter(TypeId::of::<T>(), type_name)?;

        // Fast path under the read lock: cached instance, or a factory copy
        // we can run after unlocking so dependency resolution re-enters
        // freely.
        let (factory, lifetime, creation) = {
            let services = self.read_lock()?;
            let entry = match services.get(&TypeId::of::<T>()) {
                Some(entry) => entry,
                None => {
                    return err_with_details(
                        di::SERVICE_NOT_REGISTERED,
                        "Service not registered",
                        "service_container",
                        type_name,
                    )
                }
            };
            if let Some(instance) = &entry.instance {
                return downcast::<T>(instance.clone(), type_name);
            }
            match entry.descriptor.lifetime {
                ServiceLifetime::Scoped => {
                    return err_with_details(
                        di::SCOPED_FROM_ROOT,
                        "Scoped service resolved from root container",
                        "service_container",
                        type_name,
                    )
                }
                lifetime => {
                    let factory = entry.factory.clone().ok_or_else(|| {
                        ErrorInfo::new(
                            di::FACTORY_ERROR,
                            "Service has no factory and no instance",
                            "service_container",
                        )
                        .with_details(type_name)
                    })?;
                    (factory, lifetime, entry.creation.clone())
                }
            }
        };

        if lifetime == ServiceLifetime::Singleton {
            // Per-entry creation lock: racing threads queue here so the
            // factory runs exactly once. Cycle detection already happened,
            // and factories resolving other types take other entries' locks.
            let _creation = creation.lock().map_err(|_| poisoned())?;
            {
                let services = self.read_lock()?;
                if let Some(entry) = services.get(&TypeId::of::<T>()) {
                    if let Some(existing) = &entry.instance {
                        return downcast::<T>(existing.clone(), type_name);
                    }
                }
            }
            let instance = run_factory(&factory, type_name)?;
            let mut services = self.write_lock()?;
            if let Some(entry) = services.get_mut(&TypeId::of::<T>()) {
                // The entry may have been replaced while the factory ran;
                // the first stored instance wins.
                match &entry.instance {
                    Some(existing) => return downcast::<T>(existing.clone(), type_name),
                    None => {
                        entry.instance = Some(instance.clone());
                        entry.descriptor.is_instantiated = true;
                    }
                }
            }
            return downcast::<T>(instance, type_name);
        }

        let instance = run_factory(&factory, type_name)?;
        downcast::<T>(instance, type_name)
    }

    /// Resolve, swallowing the error. Lookup convenience for optional
    /// dependencies.
    pub fn resolve_opt<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.resolve::<T>().ok()
    }

    /// Remove a registration and any cached singleton. Idempotent.
    #[track_caller]
    pub fn unregister<T: 'static>(&self) -> UnitResult {
        let type_name = std::any::type_name::<T>();
        if self.is_frozen() {
            AuditLog::log_event(AuditEvent::failed(
                AuditAction::UnregisterService,
                type_name,
                "container is frozen",
            ));
            return err(
                error_codes::common::REGISTRY_FROZEN,
                "Registry is frozen",
                "service_container",
            );
        }
        let mut services = self.write_lock()?;
        services.remove(&TypeId::of::<T>());
        AuditLog::log_event(AuditEvent::new(AuditAction::UnregisterService, type_name));
        Ok(())
    }

    /// Remove all registrations.
    #[track_caller]
    pub fn clear(&self) -> UnitResult {
        if self.is_frozen() {
            AuditLog::log_event(AuditEvent::failed(
                AuditAction::ClearServices,
                "",
                "container is frozen",
            ));
            return err(
                error_codes::common::REGISTRY_FROZEN,
                "Registry is frozen",
                "service_container",
            );
        }
        let mut services = self.write_lock()?;
        services.clear();
        AuditLog::log_event(AuditEvent::new(AuditAction::ClearServices, ""));
        Ok(())
    }

    /// Permanently reject further registration changes. Resolution keeps
    /// working, including lazy singleton creation. Irreversible.
    #[track_caller]
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
        AuditLog::log_event(AuditEvent::new(AuditAction::FreezeServiceContainer, ""));
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.services
            .read()
            .map(|s| s.contains_key(&TypeId::of::<T>()))
            .unwrap_or(false)
    }

    /// Descriptors of all registered services, in no particular order.
    pub fn registered_services(&self) -> Vec<ServiceDescriptor> {
        self.services
            .read()
            .map(|s| s.values().map(|e| e.descriptor.clone()).collect())
            .unwrap_or_default()
    }

    pub fn size(&self) -> usize {
        self.services.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Open a resolution scope over this container.
    pub fn create_scope(&self) -> scope::ServiceScope<'_> {
        scope::ServiceScope::new(self)
    }

    pub(crate) fn entry_lifetime(&self, id: TypeId) -> Option<ServiceLifetime> {
        self.services
            .read()
            .ok()
            .and_then(|s| s.get(&id).map(|e| e.descriptor.lifetime))
    }

    pub(crate) fn entry_factory(&self, id: TypeId) -> Option<ErasedFactory> {
        self.services
            .read()
            .ok()
            .and_then(|s| s.get(&id).and_then(|e| e.factory.clone()))
    }

    fn read_lock(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<TypeId, ServiceEntry>>> {
        self.services.read().map_err(|_| poisoned())
    }

    fn write_lock(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<TypeId, ServiceEntry>>> {
        self.services.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> ErrorInfo {
    ErrorInfo::new(
        error_codes::common::INTERNAL_ERROR,
        "service container lock poisoned",
        "service_container",
    )
}

fn downcast<T: Send + Sync + 'static>(instance: AnyService, type_name: &'static str) -> Result<Arc<T>> {
    instance.downcast::<T>().map_err(|_| {
        ErrorInfo::new(
            error_codes::container::VALUE_TYPE_MISMATCH,
            "Value type mismatch",
            "service_container",
        )
        .with_details(type_name)
    })
}

/// Run a service factory. Errors the factory returns propagate unchanged
/// (so cycle errors keep their code); panics become `FACTORY_ERROR`.
pub(crate) fn run_factory(factory: &ErasedFactory, type_name: &str) -> Result<AnyService> {
    let factory = factory.clone();
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || factory())) {
        Ok(result) => result,
        Err(payload) => {
            let cause = ErrorInfo::from_panic(payload.as_ref(), "service_container");
            err_with_details(
                di::FACTORY_ERROR,
                format!("factory for {type_name} failed"),
                "service_container",
                cause.message,
            )
        }
    }
}

/// Run the cycle-detection guard for a resolve attempt outside the root
/// container (used by scopes).
pub(crate) fn resolution_guard(id: TypeId, type_name: &'static str) -> Result<ResolutionGuardHandle> {
    ResolutionGuard::enter(id, type_name).map(ResolutionGuardHandle)
}

/// Opaque handle keeping a resolution-stack frame alive.
pub(crate) struct ResolutionGuardHandle(#[allow(dead_code)] ResolutionGuard);

pub(crate) fn downcast_any<T: Send + Sync + 'static>(
    instance: AnyService,
    type_name: &'static str,
) -> Result<Arc<T>> {
    downcast::<T>(instance, type_name)
}
