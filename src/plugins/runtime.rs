//! JSON module runtime.
//!
//! Executes module documents of the form:
//!
//! ```json
//! {
//!   "exports": {
//!     "AcmePlugins": {
//!       "kind": "factory",
//!       "plugins": [
//!         { "name": "acme-dest", "version": "1.0.0", "type": "destination",
//!           "requiredSettings": ["apiKey"] }
//!       ]
//!     },
//!     "ACME_BUILD": { "kind": "value", "value": "2024.1" }
//!   }
//! }
//! ```
//!
//! A `factory` export registers a factory producing declarative plugins: an
//! object yields one candidate, an array yields one per element, anything
//! else is rejected as not a list of plugins. The runtime supplies `load` and
//! `isLoaded`; `name`, `version` and `type` come from the document, so a
//! document that omits one fails validation. `load` fails when the descriptor
//! settings lack a key listed in `requiredSettings`.
//!
//! A `value` export registers a plain, non-callable value.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, ZeptoError};

use super::registry::{FactoryRegistry, PluginFactory};
use super::script::ScriptRuntime;
use super::types::{FactoryOutput, PluginCandidate};
use super::validate::ValidationError;

/// A parsed module document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleDocument {
    /// Exports by registration name.
    #[serde(default)]
    pub exports: BTreeMap<String, ModuleExport>,
}

impl ModuleDocument {
    pub fn parse(source: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(source)?)
    }
}

/// One named export of a module document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModuleExport {
    /// A callable entry point producing declarative plugins.
    Factory {
        #[serde(default)]
        plugins: Value,
    },
    /// A plain value.
    #[serde(rename = "value")]
    Constant {
        #[serde(default)]
        value: Value,
    },
}

/// Runtime for JSON module documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModuleRuntime;

impl JsonModuleRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl ScriptRuntime for JsonModuleRuntime {
    fn execute(&self, url: &str, source: &[u8], registry: &FactoryRegistry) -> Result<()> {
        let document = ModuleDocument::parse(source)
            .map_err(|e| ZeptoError::ScriptLoad(format!("Invalid module {}: {}", url, e)))?;

        for (name, export) in document.exports {
            debug!(url = %url, export = %name, "Registering export");
            match export {
                ModuleExport::Factory { plugins } => {
                    registry.register_factory(name, DeclarativeFactory { plugins })
                }
                ModuleExport::Constant { value } => registry.register_value(name, value),
            }
        }

        Ok(())
    }
}

/// Factory backing a `factory` export.
struct DeclarativeFactory {
    plugins: Value,
}

impl PluginFactory for DeclarativeFactory {
    fn create(&self, settings: &Value) -> Result<FactoryOutput> {
        match &self.plugins {
            Value::Object(_) => Ok(FactoryOutput::One(declared_candidate(
                &self.plugins,
                settings,
            ))),
            Value::Array(entries) => Ok(FactoryOutput::Many(
                entries
                    .iter()
                    .map(|entry| declared_candidate(entry, settings))
                    .collect(),
            )),
            _ => Err(ValidationError::NotAList.into()),
        }
    }
}

/// Build a candidate from one declared plugin entry.
///
/// Non-object entries expose no capabilities at all.
fn declared_candidate(entry: &Value, settings: &Value) -> PluginCandidate {
    let Value::Object(fields) = entry else {
        return PluginCandidate::new();
    };

    let mut candidate = PluginCandidate::new();
    candidate.name = fields.get("name").and_then(scalar_string);
    candidate.version = fields.get("version").and_then(scalar_string);
    candidate.plugin_type = fields.get("type").and_then(scalar_string);

    let required: Vec<String> = fields
        .get("requiredSettings")
        .and_then(Value::as_array)
        .map(|keys| keys.iter().filter_map(scalar_string).collect())
        .unwrap_or_default();

    let loaded = Arc::new(AtomicBool::new(false));
    let label = candidate.display_name().to_string();
    let settings = settings.clone();

    let load_flag = Arc::clone(&loaded);
    let candidate = candidate.with_load(move || {
        let missing: Vec<String> = required
            .iter()
            .filter(|key| settings.get(key.as_str()).is_none())
            .cloned()
            .collect();
        let label = label.clone();
        let load_flag = Arc::clone(&load_flag);
        async move {
            if !missing.is_empty() {
                return Err(ZeptoError::Config(format!(
                    "Plugin '{}' is missing settings: {}",
                    label,
                    missing.join(", ")
                )));
            }
            load_flag.store(true, Ordering::SeqCst);
            info!(plugin = %label, "Plugin loaded");
            Ok(())
        }
    });

    candidate.with_is_loaded(move || loaded.load(Ordering::SeqCst))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::validate::validate;
    use serde_json::json;

    fn execute(document: Value) -> FactoryRegistry {
        let registry = FactoryRegistry::new();
        let source = serde_json::to_vec(&document).unwrap();
        JsonModuleRuntime::new()
            .execute("mem://module.json", &source, &registry)
            .unwrap();
        registry
    }

    #[test]
    fn test_parse_document_kinds() {
        let document = ModuleDocument::parse(
            br#"{
                "exports": {
                    "A": { "kind": "factory", "plugins": { "name": "a" } },
                    "B": { "kind": "value", "value": 3 }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(document.exports.len(), 2);
        assert!(matches!(document.exports["A"], ModuleExport::Factory { .. }));
        assert!(matches!(document.exports["B"], ModuleExport::Constant { .. }));
    }

    #[test]
    fn test_execute_registers_factory_and_value() {
        let registry = execute(json!({
            "exports": {
                "A": { "kind": "factory", "plugins": [] },
                "A_VERSION": { "kind": "value", "value": "1.0" }
            }
        }));
        assert!(registry.lookup_factory("A").is_some());
        assert!(registry.contains("A_VERSION"));
        assert!(registry.lookup_factory("A_VERSION").is_none());
    }

    #[test]
    fn test_execute_rejects_malformed_document() {
        let err = JsonModuleRuntime::new()
            .execute("mem://bad", b"{ not json", &FactoryRegistry::new())
            .unwrap_err();
        assert!(matches!(err, ZeptoError::ScriptLoad(_)));
        assert!(err.to_string().contains("mem://bad"));
    }

    #[test]
    fn test_execute_rejects_unknown_kind() {
        let err = JsonModuleRuntime::new()
            .execute(
                "mem://bad",
                br#"{ "exports": { "A": { "kind": "class" } } }"#,
                &FactoryRegistry::new(),
            )
            .unwrap_err();
        assert!(matches!(err, ZeptoError::ScriptLoad(_)));
    }

    #[tokio::test]
    async fn test_factory_object_yields_one_valid_plugin() {
        let registry = execute(json!({
            "exports": {
                "A": { "kind": "factory", "plugins": { "name": "a", "version": 1, "type": "x" } }
            }
        }));
        let output = registry.lookup_factory("A").unwrap().create(&json!({})).unwrap();
        assert!(matches!(output, FactoryOutput::One(_)));

        let plugins = validate(output.resolve().await.unwrap()).unwrap();
        assert_eq!(plugins.len(), 1);
        assert_eq!(plugins[0].name(), "a");
        assert_eq!(plugins[0].version(), "1");
        assert!(!plugins[0].is_loaded());

        plugins[0].load().await.unwrap();
        assert!(plugins[0].is_loaded());
    }

    #[test]
    fn test_factory_scalar_plugins_is_not_a_list() {
        let registry = execute(json!({
            "exports": { "A": { "kind": "factory", "plugins": "nope" } }
        }));
        let err = registry
            .lookup_factory("A")
            .unwrap()
            .create(&json!({}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Not a valid list of plugins");
    }

    #[tokio::test]
    async fn test_factory_entry_missing_version_fails_validation() {
        let registry = execute(json!({
            "exports": {
                "A": { "kind": "factory", "plugins": [{ "name": "a", "type": "x" }] }
            }
        }));
        let output = registry.lookup_factory("A").unwrap().create(&json!({})).unwrap();
        let err = validate(output.resolve().await.unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Plugin: a missing required function version");
    }

    #[tokio::test]
    async fn test_non_object_entry_has_no_capabilities() {
        let registry = execute(json!({
            "exports": { "A": { "kind": "factory", "plugins": [42] } }
        }));
        let output = registry.lookup_factory("A").unwrap().create(&json!({})).unwrap();
        let err = validate(output.resolve().await.unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Plugin: unknown missing required function load");
    }

    #[tokio::test]
    async fn test_load_checks_required_settings() {
        let registry = execute(json!({
            "exports": {
                "A": {
                    "kind": "factory",
                    "plugins": { "name": "a", "version": "1", "type": "x", "requiredSettings": ["apiKey"] }
                }
            }
        }));
        let factory = registry.lookup_factory("A").unwrap();

        let without = validate(factory.create(&json!({})).unwrap().resolve().await.unwrap()).unwrap();
        let err = without[0].load().await.unwrap_err();
        assert!(err.to_string().contains("apiKey"));
        assert!(!without[0].is_loaded());

        let with = validate(
            factory
                .create(&json!({ "apiKey": "k" }))
                .unwrap()
                .resolve()
                .await
                .unwrap(),
        )
        .unwrap();
        with[0].load().await.unwrap();
        assert!(with[0].is_loaded());
    }
}
