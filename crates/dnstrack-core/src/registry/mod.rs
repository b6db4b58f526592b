//! Resolver registry
//!
//! The registry is how the binary picks a resolver backend by name. Backend
//! crates register a [`ResolverFactory`] under their name; the binary then
//! creates the resolver named in [`ResolverSettings::backend`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dnstrack_core::ResolverRegistry;
//! use dnstrack_core::config::ResolverSettings;
//!
//! let registry = ResolverRegistry::new();
//!
//! // Backend crates register their factories
//! dnstrack_resolver_hickory::register(&registry);
//!
//! // Create the configured backend
//! let resolver = registry.create_resolver(&ResolverSettings::default())?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::config::ResolverSettings;
use crate::error::{Error, Result};
use crate::traits::{Resolver, ResolverFactory};

/// Registry of resolver factories keyed by backend name
///
/// Thread-safe; lookups take a read lock.
pub struct ResolverRegistry {
    resolvers: RwLock<HashMap<String, Arc<dyn ResolverFactory>>>,
}

impl ResolverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            resolvers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a resolver factory
    ///
    /// # Parameters
    ///
    /// - `name`: Backend name (e.g., "hickory")
    /// - `factory`: Factory that creates the resolver
    ///
    /// Registering a name twice replaces the earlier factory.
    pub fn register_resolver(&self, name: impl Into<String>, factory: Box<dyn ResolverFactory>) {
        let name = name.into();
        self.write().insert(name, Arc::from(factory));
    }

    /// Create a resolver from settings
    ///
    /// # Parameters
    ///
    /// - `settings`: Backend name and per-query settings
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn Resolver>)`: Created resolver
    /// - `Err(Error)`: If the backend is not registered or creation fails
    pub fn create_resolver(&self, settings: &ResolverSettings) -> Result<Box<dyn Resolver>> {
        let factory = self
            .read()
            .get(&settings.backend)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown resolver backend: {}", settings.backend)))?;

        factory.create(settings)
    }

    /// List all registered backend names
    pub fn list_resolvers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a backend is registered
    ///
    /// # Returns
    ///
    /// `true` if registered, `false` otherwise
    pub fn has_resolver(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    // A panic while holding the lock cannot leave the map half-written,
    // so a poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn ResolverFactory>>> {
        self.resolvers.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn ResolverFactory>>> {
        self.resolvers.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
