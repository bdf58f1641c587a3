//! Plugin types for ZeptoPlug
//!
//! This module defines the descriptor parsed from configuration, the
//! unvalidated `PluginCandidate` a factory hands back, the validated `Plugin`
//! returned to the host, and the `FactoryOutput` shapes a factory may produce.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

use super::validate::Capability;

/// A remote plugin descriptor, one per module to load.
///
/// # Example
///
/// ```json
/// {
///   "url": "https://cdn.example.com/acme/plugins.json",
///   "libraryName": "AcmePlugins",
///   "settings": { "apiKey": "abc123" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlugin {
    /// Location of the module to fetch and execute.
    pub url: String,

    /// Name the module registers its factory under.
    #[serde(rename = "libraryName", alias = "library_name")]
    pub library_name: String,

    /// Plugin-specific settings, passed to the factory untouched.
    #[serde(default)]
    pub settings: Value,
}

impl RemotePlugin {
    /// Create a new descriptor.
    pub fn new(url: impl Into<String>, library_name: impl Into<String>, settings: Value) -> Self {
        Self {
            url: url.into(),
            library_name: library_name.into(),
            settings,
        }
    }
}

/// The `load` capability of a plugin.
pub type LoadFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// The `isLoaded` capability of a plugin.
pub type IsLoadedFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// A plugin-like object returned by a factory, not yet checked against the
/// capability contract. Every capability is optional here.
#[derive(Clone, Default)]
pub struct PluginCandidate {
    pub name: Option<String>,
    pub version: Option<String>,
    pub plugin_type: Option<String>,
    pub load: Option<LoadFn>,
    pub is_loaded: Option<IsLoadedFn>,
}

impl PluginCandidate {
    /// Create an empty candidate.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_type(mut self, plugin_type: impl Into<String>) -> Self {
        self.plugin_type = Some(plugin_type.into());
        self
    }

    /// Attach the `load` capability.
    pub fn with_load<F, Fut>(mut self, load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.load = Some(Arc::new(move || load().boxed()));
        self
    }

    /// Attach the `isLoaded` capability.
    pub fn with_is_loaded<F>(mut self, is_loaded: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.is_loaded = Some(Arc::new(is_loaded));
        self
    }

    /// Whether the candidate exposes the given capability.
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Load => self.load.is_some(),
            Capability::IsLoaded => self.is_loaded.is_some(),
            Capability::Name => self.name.is_some(),
            Capability::Version => self.version.is_some(),
            Capability::Type => self.plugin_type.is_some(),
        }
    }

    /// Name used in diagnostics, `"unknown"` when the candidate has none.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("unknown")
    }
}

impl fmt::Debug for PluginCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCandidate")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("plugin_type", &self.plugin_type)
            .field("load", &self.load.is_some())
            .field("is_loaded", &self.is_loaded.is_some())
            .finish()
    }
}

/// A validated plugin instance. Only produced by
/// [`validate`](super::validate::validate).
#[derive(Clone)]
pub struct Plugin {
    name: String,
    version: String,
    plugin_type: String,
    load: LoadFn,
    is_loaded: IsLoadedFn,
}

impl Plugin {
    pub(crate) fn from_parts(
        name: String,
        version: String,
        plugin_type: String,
        load: LoadFn,
        is_loaded: IsLoadedFn,
    ) -> Self {
        Self {
            name,
            version,
            plugin_type,
            load,
            is_loaded,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn plugin_type(&self) -> &str {
        &self.plugin_type
    }

    /// Invoke the plugin's `load` capability.
    pub async fn load(&self) -> Result<()> {
        (self.load)().await
    }

    /// Invoke the plugin's `isLoaded` capability.
    pub fn is_loaded(&self) -> bool {
        (self.is_loaded)()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("plugin_type", &self.plugin_type)
            .field("is_loaded", &self.is_loaded())
            .finish()
    }
}

/// What a factory returns: one candidate, several, or a value that resolves
/// later to either.
pub enum FactoryOutput {
    One(PluginCandidate),
    Many(Vec<PluginCandidate>),
    Deferred(BoxFuture<'static, Result<FactoryOutput>>),
}

impl FactoryOutput {
    /// Wrap a future resolving to factory output.
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<FactoryOutput>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }

    /// Await any deferred output and flatten the result into a list of
    /// candidates. A single candidate becomes a one-element list; the order
    /// of a list is kept.
    pub async fn resolve(self) -> Result<Vec<PluginCandidate>> {
        let mut output = self;
        loop {
            match output {
                Self::One(candidate) => return Ok(vec![candidate]),
                Self::Many(candidates) => return Ok(candidates),
                Self::Deferred(future) => output = future.await?,
            }
        }
    }
}

impl fmt::Debug for FactoryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(candidate) => f.debug_tuple("One").field(candidate).finish(),
            Self::Many(candidates) => f.debug_tuple("Many").field(candidates).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<PluginCandidate> for FactoryOutput {
    fn from(candidate: PluginCandidate) -> Self {
        Self::One(candidate)
    }
}

impl From<Vec<PluginCandidate>> for FactoryOutput {
    fn from(candidates: Vec<PluginCandidate>) -> Self {
        Self::Many(candidates)
    }
}
