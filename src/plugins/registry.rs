//! Factory registry for ZeptoPlug
//!
//! Modules do not mutate ambient global state. Instead, executing a module
//! hands it a `FactoryRegistry`, and the module registers its exports there
//! by name. The loader later reads the registry to find the factory a
//! descriptor points at.
//!
//! A process-wide registry is available through [`global_registry`]; tests
//! and embedders can create independent instances.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;

use super::types::FactoryOutput;

/// Produces plugin candidates from descriptor settings.
///
/// Returning `Err` is the synchronous failure path; a deferred failure is
/// expressed through [`FactoryOutput::Deferred`].
pub trait PluginFactory: Send + Sync {
    fn create(&self, settings: &Value) -> Result<FactoryOutput>;
}

impl<F> PluginFactory for F
where
    F: Fn(&Value) -> Result<FactoryOutput> + Send + Sync,
{
    fn create(&self, settings: &Value) -> Result<FactoryOutput> {
        self(settings)
    }
}

/// What a registered name maps to.
#[derive(Clone)]
pub enum Export {
    /// A callable entry point.
    Factory(Arc<dyn PluginFactory>),
    /// A plain value. Present, but not callable.
    Value(Value),
}

impl Export {
    pub fn is_factory(&self) -> bool {
        matches!(self, Self::Factory(_))
    }
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Name-keyed store of module exports.
///
/// Names are case-sensitive. Registering an existing name replaces the
/// previous export.
#[derive(Default)]
pub struct FactoryRegistry {
    exports: RwLock<HashMap<String, Export>>,
}

static GLOBAL_REGISTRY: Lazy<Arc<FactoryRegistry>> =
    Lazy::new(|| Arc::new(FactoryRegistry::new()));

/// The process-wide registry.
pub fn global_registry() -> Arc<FactoryRegistry> {
    Arc::clone(&GLOBAL_REGISTRY)
}

impl FactoryRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            exports: RwLock::new(HashMap::new()),
        }
    }

    /// Register a factory under `name`.
    pub fn register_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: PluginFactory + 'static,
    {
        self.insert(name.into(), Export::Factory(Arc::new(factory)));
    }

    /// Register a non-callable value under `name`.
    pub fn register_value(&self, name: impl Into<String>, value: Value) {
        self.insert(name.into(), Export::Value(value));
    }

    fn insert(&self, name: String, export: Export) {
        let mut exports = self.exports.write().unwrap_or_else(PoisonError::into_inner);
        if exports.contains_key(&name) {
            debug!(name = %name, "Replacing existing export");
        }
        exports.insert(name, export);
    }

    /// Get the export registered under `name`, whatever its kind.
    pub fn get(&self, name: &str) -> Option<Export> {
        self.exports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Get the factory registered under `name`.
    ///
    /// Returns `None` when the name is absent or maps to a plain value.
    pub fn lookup_factory(&self, name: &str) -> Option<Arc<dyn PluginFactory>> {
        match self.get(name)? {
            Export::Factory(factory) => Some(factory),
            Export::Value(_) => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.exports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Remove and return the export registered under `name`.
    pub fn remove(&self, name: &str) -> Option<Export> {
        self.exports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .exports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.exports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.exports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("names", &self.names())
            .finish()
    }
}
