//! Remote plugin system for ZeptoPlug
//!
//! This module loads plugin modules hosted elsewhere and turns them into
//! validated plugin instances. A host supplies a list of descriptors, each
//! naming a module location, the name the module registers its factory
//! under, and settings for that factory. Every descriptor is fetched,
//! executed, invoked and validated concurrently; a broken descriptor is
//! logged and dropped without affecting the rest.
//!
//! # Architecture
//!
//! - **types**: Core data structures (`RemotePlugin`, `PluginCandidate`, `Plugin`, `FactoryOutput`)
//! - **registry**: Name-keyed `FactoryRegistry` that modules publish exports into
//! - **script**: `ScriptLoader`/`ScriptRuntime` traits plus HTTP and in-process loaders
//! - **runtime**: JSON module documents as a `ScriptRuntime`
//! - **validate**: Capability contract checks (`load`, `isLoaded`, `name`, `version`, `type`)
//! - **loader**: The concurrent fetch → lookup → invoke → validate pipeline
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::{json, Value};
//! use zeptoplug::plugins::{
//!     FactoryOutput, FactoryRegistry, PluginCandidate, RemoteLoader, RemotePlugin,
//!     StaticScriptLoader,
//! };
//!
//! let modules = StaticScriptLoader::new().with_module("builtin://hello", |registry| {
//!     registry.register_factory("Hello", |_settings: &Value| -> zeptoplug::Result<FactoryOutput> {
//!         Ok(PluginCandidate::new()
//!             .with_name("hello")
//!             .with_version("1.0.0")
//!             .with_type("utility")
//!             .with_load(|| async { Ok(()) })
//!             .with_is_loaded(|| true)
//!             .into())
//!     });
//!     Ok(())
//! });
//!
//! let loader = RemoteLoader::new(modules).with_registry(Arc::new(FactoryRegistry::new()));
//! let descriptors = vec![RemotePlugin::new("builtin://hello", "Hello", json!({}))];
//!
//! let plugins = tokio_test::block_on(loader.load(Some(&descriptors)));
//! assert_eq!(plugins.len(), 1);
//! assert_eq!(plugins[0].name(), "hello");
//! ```

mod loader;
pub mod registry;
pub mod runtime;
pub mod script;
pub mod types;
pub mod validate;

pub use loader::{remote_loader, LoadFailure, LoadReport, RemoteLoader};
pub use registry::{global_registry, Export, FactoryRegistry, PluginFactory};
pub use runtime::{JsonModuleRuntime, ModuleDocument, ModuleExport};
pub use script::{HttpScriptLoader, ScriptLoader, ScriptRuntime, StaticScriptLoader};
pub use types::{FactoryOutput, Plugin, PluginCandidate, RemotePlugin};
pub use validate::{validate, Capability, ValidationError, REQUIRED_CAPABILITIES};
