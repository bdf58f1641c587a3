//! Module fetching and execution.
//!
//! A `ScriptLoader` takes a descriptor's location, obtains the module and
//! executes it against a `FactoryRegistry`, which is the only capability a
//! module gets for publishing its exports. Two loaders ship with the crate:
//!
//! - [`HttpScriptLoader`] fetches `http(s)://` URLs with reqwest, reads
//!   `file://` URLs and bare paths from disk, and hands the bytes to a
//!   [`ScriptRuntime`].
//! - [`StaticScriptLoader`] serves modules compiled into the host, keyed by
//!   URL.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::{Result, ZeptoError};

use super::registry::FactoryRegistry;

/// Default cap on module size: 5 MiB.
pub const DEFAULT_MAX_SCRIPT_BYTES: usize = 5 * 1024 * 1024;

/// Fetches a module and executes it. Resolves once the module has run.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load_script(&self, url: &str, registry: &FactoryRegistry) -> Result<()>;
}

/// Executes fetched module source, registering whatever it exports.
pub trait ScriptRuntime: Send + Sync {
    fn execute(&self, url: &str, source: &[u8], registry: &FactoryRegistry) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HTTP / filesystem loader
// ---------------------------------------------------------------------------

/// Loader for network and filesystem locations.
pub struct HttpScriptLoader {
    client: Client,
    runtime: Arc<dyn ScriptRuntime>,
    max_script_bytes: usize,
}

impl HttpScriptLoader {
    /// Create a loader with a default HTTP client and size cap.
    pub fn new<R>(runtime: R) -> Self
    where
        R: ScriptRuntime + 'static,
    {
        Self {
            client: Client::new(),
            runtime: Arc::new(runtime),
            max_script_bytes: DEFAULT_MAX_SCRIPT_BYTES,
        }
    }

    /// Create a loader using the user agent, timeout and size cap from config.
    pub fn from_config<R>(config: &LoaderConfig, runtime: R) -> Result<Self>
    where
        R: ScriptRuntime + 'static,
    {
        let mut builder = Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            runtime: Arc::new(runtime),
            max_script_bytes: config.max_script_bytes,
        })
    }

    pub fn max_script_bytes(&self) -> usize {
        self.max_script_bytes
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_http(url).await;
        }

        if let Some(path) = url.strip_prefix("file://") {
            return self.read_file(Path::new(path)).await;
        }

        if url.contains("://") {
            return Err(ZeptoError::ScriptLoad(format!(
                "Unsupported module location '{}'",
                url
            )));
        }

        self.read_file(Path::new(url)).await
    }

    async fn fetch_http(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ZeptoError::ScriptLoad(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ZeptoError::ScriptLoad(format!(
                "Failed to fetch {}: HTTP {}",
                url, status
            )));
        }

        if let Some(length) = response.content_length() {
            self.check_size(url, usize::try_from(length).unwrap_or(usize::MAX))?;
        }

        // Content-Length is optional, so the cap is also enforced per chunk.
        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk
                .map_err(|e| ZeptoError::ScriptLoad(format!("Failed to read {}: {}", url, e)))?;
            self.check_size(url, body.len().saturating_add(chunk.len()))?;
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ZeptoError::ScriptLoad(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.check_size(&path.display().to_string(), bytes.len())?;
        Ok(bytes)
    }

    fn check_size(&self, url: &str, len: usize) -> Result<()> {
        if len > self.max_script_bytes {
            return Err(ZeptoError::ScriptLoad(format!(
                "Module {} is {} bytes, limit is {}",
                url, len, self.max_script_bytes
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ScriptLoader for HttpScriptLoader {
    async fn load_script(&self, url: &str, registry: &FactoryRegistry) -> Result<()> {
        let source = self.fetch(url).await?;
        debug!(url = %url, bytes = source.len(), "Fetched module");
        self.runtime.execute(url, &source, registry)
    }
}

impl fmt::Debug for HttpScriptLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpScriptLoader")
            .field("max_script_bytes", &self.max_script_bytes)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// In-process loader
// ---------------------------------------------------------------------------

/// A module compiled into the host: registers its exports when executed.
pub type StaticModule = Arc<dyn Fn(&FactoryRegistry) -> Result<()> + Send + Sync>;

/// Loader serving in-process modules keyed by URL.
///
/// Unknown URLs fail the same way a missing remote resource would.
#[derive(Clone, Default)]
pub struct StaticScriptLoader {
    modules: HashMap<String, StaticModule>,
}

impl StaticScriptLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a module served at `url`.
    pub fn with_module<F>(mut self, url: impl Into<String>, module: F) -> Self
    where
        F: Fn(&FactoryRegistry) -> Result<()> + Send + Sync + 'static,
    {
        self.modules.insert(url.into(), Arc::new(module));
        self
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

#[async_trait]
impl ScriptLoader for StaticScriptLoader {
    async fn load_script(&self, url: &str, registry: &FactoryRegistry) -> Result<()> {
        let module = self
            .modules
            .get(url)
            .ok_or_else(|| ZeptoError::ScriptLoad(format!("No module served at '{}'", url)))?;
        module(registry)
    }
}

impl fmt::Debug for StaticScriptLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut urls: Vec<&String> = self.modules.keys().collect();
        urls.sort();
        f.debug_struct("StaticScriptLoader")
            .field("urls", &urls)
            .finish()
    }
}
