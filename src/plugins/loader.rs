//! Remote plugin loading for ZeptoPlug
//!
//! This module drives every descriptor through the fetch → lookup → invoke →
//! validate pipeline. Descriptors are processed concurrently on the calling
//! task; a descriptor that fails at any step is logged as a warning and
//! contributes nothing, without affecting the others.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, warn};

use crate::config::{Config, LoaderConfig};
use crate::error::{Result, ZeptoError};

use super::registry::{global_registry, FactoryRegistry};
use super::runtime::JsonModuleRuntime;
use super::script::{HttpScriptLoader, ScriptLoader};
use super::types::{Plugin, RemotePlugin};
use super::validate::validate;

/// A descriptor that failed to produce plugins.
#[derive(Debug)]
pub struct LoadFailure {
    pub descriptor: RemotePlugin,
    pub error: ZeptoError,
}

/// Everything a load run produced.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Validated plugins, in completion order across descriptors.
    pub plugins: Vec<Plugin>,
    /// Descriptors that failed to load, invoke or validate.
    pub failures: Vec<LoadFailure>,
    /// Descriptors whose entry point was not a registered factory.
    pub skipped: Vec<RemotePlugin>,
}

/// Loads remote plugin modules and collects the plugins they produce.
///
/// # Example
///
/// ```no_run
/// use serde_json::json;
/// use zeptoplug::plugins::{HttpScriptLoader, JsonModuleRuntime, RemoteLoader, RemotePlugin};
///
/// # async fn run() {
/// let loader = RemoteLoader::new(HttpScriptLoader::new(JsonModuleRuntime::new()));
/// let descriptors = vec![RemotePlugin::new(
///     "https://cdn.example.com/acme/plugins.json",
///     "AcmePlugins",
///     json!({ "apiKey": "abc123" }),
/// )];
///
/// for plugin in loader.load(Some(&descriptors)).await {
///     println!("{} v{} ({})", plugin.name(), plugin.version(), plugin.plugin_type());
/// }
/// # }
/// ```
pub struct RemoteLoader {
    script_loader: Arc<dyn ScriptLoader>,
    registry: Arc<FactoryRegistry>,
}

impl RemoteLoader {
    /// Create a loader that resolves entry points in the process-wide registry.
    pub fn new<L>(script_loader: L) -> Self
    where
        L: ScriptLoader + 'static,
    {
        Self {
            script_loader: Arc::new(script_loader),
            registry: global_registry(),
        }
    }

    /// Create an HTTP-backed loader for JSON modules from loader config.
    pub fn from_config(config: &LoaderConfig) -> Result<Self> {
        Ok(Self::new(HttpScriptLoader::from_config(
            config,
            JsonModuleRuntime::new(),
        )?))
    }

    /// Resolve entry points in `registry` instead of the process-wide one.
    pub fn with_registry(mut self, registry: Arc<FactoryRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &FactoryRegistry {
        &self.registry
    }

    /// Load every descriptor and return the validated plugins.
    ///
    /// `None` is treated as an empty list. Never fails: failed descriptors are
    /// logged and left out.
    pub async fn load(&self, descriptors: Option<&[RemotePlugin]>) -> Vec<Plugin> {
        self.load_with_report(descriptors).await.plugins
    }

    /// Like [`load`](Self::load), but also reports which descriptors failed
    /// and which were skipped.
    pub async fn load_with_report(&self, descriptors: Option<&[RemotePlugin]>) -> LoadReport {
        let descriptors = descriptors.unwrap_or_default();
        let mut report = LoadReport::default();

        let mut tasks: FuturesUnordered<_> = descriptors
            .iter()
            .map(|descriptor| async move { (descriptor, self.load_one(descriptor).await) })
            .collect();

        while let Some((descriptor, outcome)) = tasks.next().await {
            match outcome {
                Ok(Some(plugins)) => {
                    debug!(
                        url = %descriptor.url,
                        library = %descriptor.library_name,
                        plugins = plugins.len(),
                        "Loaded remote plugin"
                    );
                    report.plugins.extend(plugins);
                }
                Ok(None) => {
                    debug!(
                        url = %descriptor.url,
                        library = %descriptor.library_name,
                        "No factory registered under library name, skipping"
                    );
                    report.skipped.push(descriptor.clone());
                }
                Err(error) => {
                    warn!(
                        url = %descriptor.url,
                        library = %descriptor.library_name,
                        error = %error,
                        "Failed to load remote plugin"
                    );
                    report.failures.push(LoadFailure {
                        descriptor: descriptor.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            descriptors = descriptors.len(),
            plugins = report.plugins.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Remote plugin load finished"
        );

        report
    }

    /// Run one descriptor through the pipeline. `Ok(None)` means the entry
    /// point was not a registered factory.
    async fn load_one(&self, descriptor: &RemotePlugin) -> Result<Option<Vec<Plugin>>> {
        self.script_loader
            .load_script(&descriptor.url, &self.registry)
            .await?;

        let Some(factory) = self.registry.lookup_factory(&descriptor.library_name) else {
            return Ok(None);
        };

        let output = factory
            .create(&descriptor.settings)
            .map_err(into_invocation)?;
        let candidates = output.resolve().await.map_err(into_invocation)?;

        Ok(Some(validate(candidates)?))
    }
}

impl std::fmt::Debug for RemoteLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLoader")
            .field("registry", &self.registry)
            .finish()
    }
}

/// Classify a factory error as an invocation failure, keeping shape errors.
fn into_invocation(error: ZeptoError) -> ZeptoError {
    match error {
        ZeptoError::Invocation(_) | ZeptoError::Validation(_) => error,
        other => ZeptoError::Invocation(other.to_string()),
    }
}

/// Load the remote plugins listed in `config` over HTTP, resolving entry
/// points in the process-wide registry.
pub async fn remote_loader(config: &Config) -> Vec<Plugin> {
    let loader = RemoteLoader::from_config(&config.loader).unwrap_or_else(|e| {
        warn!(error = %e, "Invalid loader configuration, using defaults");
        RemoteLoader::new(HttpScriptLoader::new(JsonModuleRuntime::new()))
    });
    loader.load(Some(&config.remote_plugins)).await
}
