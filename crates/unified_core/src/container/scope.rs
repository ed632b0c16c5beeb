//! Resolution scopes for scoped-lifetime services.
//!
//! A scope caches one instance per scoped type for its lifetime and
//! delegates singleton and transient resolution to the root container.
//! When the scope drops, its instances are released in reverse creation
//! order.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::error_codes::di;
use crate::result::{err_with_details, Result};

use super::{downcast_any, resolution_guard, run_factory, AnyService, ServiceContainer, ServiceLifetime};

/// A unit of work over a [`ServiceContainer`].
///
/// Scopes borrow the container, so they cannot outlive it. Nested scopes
/// share the same root container but keep their own scoped instances.
pub struct ServiceScope<'a> {
    root: &'a ServiceContainer,
    scoped: RwLock<HashMap<TypeId, AnyService>>,
    creation_order: Mutex<Vec<TypeId>>,
}

impl<'a> ServiceScope<'a> {
    pub(crate) fn new(root: &'a ServiceContainer) -> Self {
        Self {
            root,
            scoped: RwLock::new(HashMap::new()),
            creation_order: Mutex::new(Vec::new()),
        }
    }

    /// Resolve a service within this scope.
    ///
    /// Scoped registrations are cached per scope; singletons and transients
    /// behave exactly as on the root container.
    pub fn resolve<T>(&self) -> Result<std::sync::Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();

        match self.root.entry_lifetime(id) {
            None => err_with_details(
                di::SERVICE_NOT_REGISTERED,
                "Service not registered",
                "service_container",
                type_name,
            ),
            Some(ServiceLifetime::Singleton) | Some(ServiceLifetime::Transient) => {
                self.root.resolve::<T>()
            }
            Some(ServiceLifetime::Scoped) => self.resolve_scoped::<T>(id, type_name),
        }
    }

    /// Resolve, swallowing the error.
    pub fn resolve_opt<T>(&self) -> Option<std::sync::Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.resolve::<T>().ok()
    }

    fn resolve_scoped<T>(&self, id: TypeId, type_name: &'static str) -> Result<std::sync::Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let _guard = resolution_guard(id, type_name)?;

        if let Ok(scoped) = self.scoped.read() {
            if let Some(instance) = scoped.get(&id) {
                return downcast_any::<T>(instance.clone(), type_name);
            }
        }

        let factory = self.root.entry_factory(id).ok_or_else(|| {
            crate::error::ErrorInfo::new(
                di::FACTORY_ERROR,
                "Service has no factory and no instance",
                "service_container",
            )
            .with_details(type_name)
        })?;

        let instance = run_factory(&factory, type_name)?;

        // Another thread of this scope may have stored its instance while
        // ours was being built. First stored wins.
        let mut scoped = self.scoped.write().map_err(|_| {
            crate::error::ErrorInfo::new(
                crate::error_codes::common::INTERNAL_ERROR,
                "scope lock poisoned",
                "service_container",
            )
        })?;
        if let Some(existing) = scoped.get(&id) {
            return downcast_any::<T>(existing.clone(), type_name);
        }
        scoped.insert(id, instance.clone());
        if let Ok(mut order) = self.creation_order.lock() {
            order.push(id);
        }
        drop(scoped);

        downcast_any::<T>(instance, type_name)
    }

    /// Open a nested scope over the same root container. The nested scope
    /// keeps its own scoped instances.
    pub fn create_scope(&self) -> ServiceScope<'a> {
        ServiceScope::new(self.root)
    }

    /// Number of scoped instances created in this scope so far.
    pub fn instance_count(&self) -> usize {
        self.scoped.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl Drop for ServiceScope<'_> {
    fn drop(&mut self) {
        // Release in reverse creation order so later services can depend on
        // earlier ones until the very end.
        let order = match self.creation_order.lock() {
            Ok(mut order) => std::mem::take(&mut *order),
            Err(_) => return,
        };
        if let Ok(mut scoped) = self.scoped.write() {
            for id in order.into_iter().rev() {
                scoped.remove(&id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[derive(Debug, Default)]
    struct SessionState;

    #[derive(Default)]
    struct Shared;

    #[test]
    fn test_scoped_instance_cached_per_scope() {
        let container = ServiceContainer::new();
        container
            .register_type::<SessionState>(ServiceLifetime::Scoped)
            .unwrap();

        let scope = container.create_scope();
        let a = scope.resolve::<SessionState>().unwrap();
        let b = scope.resolve::<SessionState>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(scope.instance_count(), 1);

        let other = container.create_scope();
        let c = other.resolve::<SessionState>().unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_singletons_shared_across_scopes() {
        let container = ServiceContainer::new();
        container
            .register_type::<Shared>(ServiceLifetime::Singleton)
            .unwrap();

        let s1 = container.create_scope();
        let s2 = container.create_scope();
        let a = s1.resolve::<Shared>().unwrap();
        let b = s2.resolve::<Shared>().unwrap();
        let c = container.resolve::<Shared>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_nested_scope_has_own_instances() {
        let container = ServiceContainer::new();
        container
            .register_type::<SessionState>(ServiceLifetime::Scoped)
            .unwrap();

        let outer = container.create_scope();
        let a = outer.resolve::<SessionState>().unwrap();
        let inner = outer.create_scope();
        let b = inner.resolve::<SessionState>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unregistered_from_scope() {
        let container = ServiceContainer::new();
        let scope = container.create_scope();
        let e = scope.resolve::<SessionState>().unwrap_err();
        assert_eq!(e.code, di::SERVICE_NOT_REGISTERED);
        assert!(scope.resolve_opt::<SessionState>().is_none());
    }

    #[test]
    fn test_drop_releases_in_reverse_creation_order() {
        static DROPPED: AtomicUsize = AtomicUsize::new(0);

        struct First;
        struct Second;

        impl Drop for First {
            fn drop(&mut self) {
                // First was created first, so it must be dropped last.
                assert_eq!(DROPPED.fetch_add(1, Ordering::SeqCst), 1);
            }
        }
        impl Drop for Second {
            fn drop(&mut self) {
                assert_eq!(DROPPED.fetch_add(1, Ordering::SeqCst), 0);
            }
        }

        let container = ServiceContainer::new();
        container
            .register_factory::<First, _>(ServiceLifetime::Scoped, || Ok(Arc::new(First)))
            .unwrap();
        container
            .register_factory::<Second, _>(ServiceLifetime::Scoped, || Ok(Arc::new(Second)))
            .unwrap();

        {
            let scope = container.create_scope();
            let _f = scope.resolve::<First>().unwrap();
            let _s = scope.resolve::<Second>().unwrap();
            // Local handles drop before the scope's cached Arcs.
        }
        assert_eq!(DROPPED.load(Ordering::SeqCst), 2);
    }
}
