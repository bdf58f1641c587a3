//! Capability contract checks for factory output.
//!
//! A factory hands back `PluginCandidate`s whose capabilities are all
//! optional. `validate` turns a whole batch into `Plugin`s or rejects the
//! batch on the first missing capability.

use std::fmt;

use thiserror::Error;

use super::types::{Plugin, PluginCandidate};

/// A named operation every plugin must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Load,
    IsLoaded,
    Name,
    Version,
    Type,
}

impl Capability {
    /// The capability's name as it appears in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::IsLoaded => "isLoaded",
            Self::Name => "name",
            Self::Version => "version",
            Self::Type => "type",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities checked on every candidate, in check order.
pub const REQUIRED_CAPABILITIES: [Capability; 5] = [
    Capability::Load,
    Capability::IsLoaded,
    Capability::Name,
    Capability::Version,
    Capability::Type,
];

/// Why a factory's output was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The export produced something that is neither a plugin nor a list of plugins.
    #[error("Not a valid list of plugins")]
    NotAList,

    /// A candidate lacks one of the required capabilities.
    #[error("Plugin: {plugin} missing required function {capability}")]
    MissingCapability {
        plugin: String,
        capability: Capability,
    },
}

/// Check a single candidate against the contract.
pub fn check_candidate(candidate: &PluginCandidate) -> Result<(), ValidationError> {
    match REQUIRED_CAPABILITIES
        .iter()
        .find(|capability| !candidate.has(**capability))
    {
        Some(capability) => Err(ValidationError::MissingCapability {
            plugin: candidate.display_name().to_string(),
            capability: *capability,
        }),
        None => Ok(()),
    }
}

/// Validate every candidate and convert the batch into plugins.
///
/// All or nothing: one failing candidate rejects the whole batch. Order is
/// preserved.
pub fn validate(candidates: Vec<PluginCandidate>) -> Result<Vec<Plugin>, ValidationError> {
    for candidate in &candidates {
        check_candidate(candidate)?;
    }

    Ok(candidates.into_iter().filter_map(into_plugin).collect())
}

fn into_plugin(candidate: PluginCandidate) -> Option<Plugin> {
    Some(Plugin::from_parts(
        candidate.name?,
        candidate.version?,
        candidate.plugin_type?,
        candidate.load?,
        candidate.is_loaded?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(name: &str) -> PluginCandidate {
        PluginCandidate::new()
            .with_name(name)
            .with_version("1")
            .with_type("x")
            .with_load(|| async { Ok(()) })
            .with_is_loaded(|| false)
    }

    #[test]
    fn test_capability_names() {
        let names: Vec<&str> = REQUIRED_CAPABILITIES.iter().map(|c| c.as_str()).collect();
        assert_eq!(names, vec!["load", "isLoaded", "name", "version", "type"]);
    }

    #[test]
    fn test_validate_all_valid_keeps_order() {
        let plugins = validate(vec![full("a"), full("b")]).unwrap();
        assert_eq!(plugins.len(), 2);
        assert_eq!(plugins[0].name(), "a");
        assert_eq!(plugins[1].name(), "b");
        assert_eq!(plugins[0].version(), "1");
        assert_eq!(plugins[0].plugin_type(), "x");
        assert!(!plugins[0].is_loaded());
    }

    #[test]
    fn test_validate_empty_batch() {
        assert!(validate(vec![]).unwrap().is_empty());
    }

    #[test]
    fn test_validate_missing_is_loaded() {
        let mut candidate = full("a");
        candidate.is_loaded = None;
        let err = validate(vec![candidate]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingCapability {
                plugin: "a".to_string(),
                capability: Capability::IsLoaded,
            }
        );
        assert_eq!(err.to_string(), "Plugin: a missing required function isLoaded");
    }

    #[test]
    fn test_validate_missing_name_reports_unknown() {
        let mut candidate = full("a");
        candidate.name = None;
        let err = validate(vec![candidate]).unwrap_err();
        assert_eq!(err.to_string(), "Plugin: unknown missing required function name");
    }

    #[test]
    fn test_validate_reports_first_missing_in_contract_order() {
        let candidate = PluginCandidate::new().with_name("bare");
        let err = check_candidate(&candidate).unwrap_err();
        assert_eq!(err.to_string(), "Plugin: bare missing required function load");
    }

    #[test]
    fn test_validate_one_bad_candidate_rejects_batch() {
        let mut bad = full("b");
        bad.plugin_type = None;
        let err = validate(vec![full("a"), bad, full("c")]).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingCapability {
                capability: Capability::Type,
                ..
            }
        ));
    }

    #[test]
    fn test_not_a_list_display() {
        assert_eq!(
            ValidationError::NotAList.to_string(),
            "Not a valid list of plugins"
        );
    }
}
