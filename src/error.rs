//! Error types for ZeptoPlug
//!
//! This module defines all error types used throughout the loader.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

use crate::plugins::ValidationError;

/// The primary error type for ZeptoPlug operations.
#[derive(Error, Debug)]
pub enum ZeptoError {
    /// Configuration-related errors (invalid config, unreadable config file, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A remote module could not be fetched or executed
    #[error("Script load error: {0}")]
    ScriptLoad(String),

    /// A plugin factory failed, either synchronously or through its deferred output
    #[error("Invocation error: {0}")]
    Invocation(String),

    /// Factory output did not satisfy the plugin capability contract
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for ZeptoPlug operations.
pub type Result<T> = std::result::Result<T, ZeptoError>;
