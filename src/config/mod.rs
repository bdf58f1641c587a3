//! Configuration for ZeptoPlug
//!
//! Configuration is read from a JSON file (default `~/.zeptoplug/config.json`,
//! overridable with `ZEPTOPLUG_CONFIG`) and then adjusted by `ZEPTOPLUG_*`
//! environment variables.
//!
//! # Example config.json
//!
//! ```json
//! {
//!   "remotePlugins": [
//!     {
//!       "url": "https://cdn.example.com/acme/plugins.json",
//!       "libraryName": "AcmePlugins",
//!       "settings": { "apiKey": "abc123" }
//!     }
//!   ],
//!   "loader": {
//!     "user_agent": "zeptoplug/0.1",
//!     "timeout_secs": 30
//!   }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ZeptoError};
use crate::plugins::script::DEFAULT_MAX_SCRIPT_BYTES;
use crate::plugins::RemotePlugin;

const DEFAULT_USER_AGENT: &str = "zeptoplug/0.1 (+https://github.com/qhkm/zeptoplug)";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote plugin descriptors to load. Absent means none.
    #[serde(rename = "remotePlugins", alias = "remote_plugins")]
    pub remote_plugins: Vec<RemotePlugin>,

    /// Settings for fetching modules.
    pub loader: LoaderConfig,
}

/// Settings for the HTTP module loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// User-Agent header sent when fetching modules.
    pub user_agent: String,

    /// Per-request timeout in seconds. `None` waits indefinitely.
    pub timeout_secs: Option<u64>,

    /// Largest module accepted, in bytes.
    pub max_script_bytes: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: None,
            max_script_bytes: DEFAULT_MAX_SCRIPT_BYTES,
        }
    }
}

impl Config {
    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ZeptoError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load the config at [`Config::path`], falling back to defaults when the
    /// file does not exist. Environment overrides are applied either way.
    pub fn load_or_default() -> Result<Self> {
        let mut config = match Self::path() {
            Some(path) if path.exists() => Self::load(&path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file location: `ZEPTOPLUG_CONFIG` if set, else
    /// `~/.zeptoplug/config.json`.
    pub fn path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ZEPTOPLUG_CONFIG") {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        Self::dir().map(|dir| dir.join("config.json"))
    }

    /// The ZeptoPlug home directory (`~/.zeptoplug`).
    pub fn dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".zeptoplug"))
    }

    /// Apply `ZEPTOPLUG_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(agent) = std::env::var("ZEPTOPLUG_USER_AGENT") {
            if !agent.trim().is_empty() {
                self.loader.user_agent = agent;
            }
        }

        if let Ok(raw) = std::env::var("ZEPTOPLUG_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.loader.timeout_secs = None,
                Ok(secs) => self.loader.timeout_secs = Some(secs),
                Err(_) => warn!(value = %raw, "Ignoring invalid ZEPTOPLUG_TIMEOUT_SECS"),
            }
        }

        if let Ok(raw) = std::env::var("ZEPTOPLUG_MAX_SCRIPT_BYTES") {
            match raw.trim().parse::<usize>() {
                Ok(bytes) if bytes > 0 => self.loader.max_script_bytes = bytes,
                _ => warn!(value = %raw, "Ignoring invalid ZEPTOPLUG_MAX_SCRIPT_BYTES"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(config.remote_plugins.is_empty());
        assert_eq!(config.loader.user_agent, DEFAULT_USER_AGENT);
        assert!(config.loader.timeout_secs.is_none());
        assert_eq!(config.loader.max_script_bytes, DEFAULT_MAX_SCRIPT_BYTES);
    }

    #[test]
    fn test_config_deserialization_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.remote_plugins.is_empty());
        assert_eq!(config.loader.max_script_bytes, DEFAULT_MAX_SCRIPT_BYTES);
    }

    #[test]
    fn test_config_parses_remote_plugins() {
        let json_str = r#"{
            "remotePlugins": [
                { "url": "https://cdn.example.com/a.json", "libraryName": "A", "settings": {} },
                { "url": "b.json", "libraryName": "B" }
            ],
            "loader": { "timeout_secs": 15 }
        }"#;
        let config: Config = serde_json::from_str(json_str).unwrap();
        assert_eq!(config.remote_plugins.len(), 2);
        assert_eq!(config.remote_plugins[0].library_name, "A");
        assert!(config.remote_plugins[1].settings.is_null());
        assert_eq!(config.loader.timeout_secs, Some(15));
        assert_eq!(config.loader.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_config_accepts_snake_case_key() {
        let json_str = r#"{ "remote_plugins": [ { "url": "a.json", "libraryName": "A" } ] }"#;
        let config: Config = serde_json::from_str(json_str).unwrap();
        assert_eq!(config.remote_plugins.len(), 1);
    }

    #[test]
    fn test_config_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(
            &path,
            r#"{ "remotePlugins": [ { "url": "a.json", "libraryName": "A" } ] }"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.remote_plugins[0].url, "a.json");
    }

    #[test]
    fn test_config_load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/zeptoplug/config.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_config_load_malformed_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.json");
        fs::write(&path, "{ broken").unwrap();
        assert!(matches!(Config::load(&path), Err(ZeptoError::Json(_))));
    }

    #[test]
    fn test_config_round_trips_wire_names() {
        let config: Config = serde_json::from_str(
            r#"{ "remotePlugins": [ { "url": "a.json", "libraryName": "A" } ] }"#,
        )
        .unwrap();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["remotePlugins"][0]["libraryName"], "A");
    }
}
