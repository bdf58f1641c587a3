//! ZeptoPlug - Concurrent loader for remotely hosted plugin modules

pub mod config;
pub mod error;
pub mod plugins;

pub use config::Config;
pub use error::{Result, ZeptoError};
