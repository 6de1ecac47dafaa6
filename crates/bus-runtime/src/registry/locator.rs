//! Typed and named singleton store handed to extensions and components.

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::error::CompositionError;

type Entry = Box<dyn Any + Send + Sync>;

/// Service locator filled during composition.
///
/// Typed entries are keyed by their Rust type (store `Arc<dyn Trait>` for
/// trait objects). Named entries hold the components registered by
/// `register_all`.
#[derive(Default)]
pub struct ServiceLocator {
    typed: RwLock<HashMap<TypeId, Entry>>,
    named: RwLock<BTreeMap<String, Entry>>,
}

impl ServiceLocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide the instance for `T`, keeping an existing one.
    ///
    /// Returns `false` when `T` was already provided.
    pub fn provide<T: Clone + Send + Sync + 'static>(&self, value: T) -> bool {
        let mut typed = self.typed.write();
        if typed.contains_key(&TypeId::of::<T>()) {
            return false;
        }
        typed.insert(TypeId::of::<T>(), Box::new(value));
        true
    }

    /// # Errors
    ///
    /// `MissingDependency` naming `T` if nothing provided it.
    pub fn resolve<T: Clone + 'static>(&self) -> Result<T, CompositionError> {
        self.typed
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
            .cloned()
            .ok_or_else(|| CompositionError::missing(type_name::<T>()))
    }

    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.typed.read().contains_key(&TypeId::of::<T>())
    }

    /// Register a named singleton. An existing entry under `name` is kept.
    pub fn provide_named<T: Clone + Send + Sync + 'static>(&self, name: &str, value: T) -> bool {
        let mut named = self.named.write();
        if named.contains_key(name) {
            return false;
        }
        named.insert(name.to_string(), Box::new(value));
        true
    }

    /// # Errors
    ///
    /// `MissingDependency` if `name` is unknown or holds another type.
    pub fn resolve_named<T: Clone + 'static>(&self, name: &str) -> Result<T, CompositionError> {
        self.named
            .read()
            .get(name)
            .and_then(|entry| entry.downcast_ref::<T>())
            .cloned()
            .ok_or_else(|| CompositionError::missing(format!("{name} ({})", type_name::<T>())))
    }

    #[must_use]
    pub fn contains_named(&self, name: &str) -> bool {
        self.named.read().contains_key(name)
    }

    /// Names of every named singleton, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.named.read().keys().cloned().collect()
    }
}
