//! Configuration types for template processing.
//!
//! All types implement [`serde::Deserialize`] so they can be loaded from
//! external sources; every section falls back to its defaults when absent.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration combining graph and diff settings.
//! - [`GraphConfig`] - Controls how references are discovered and resolved.
//! - [`DiffConfig`] - Controls which entries a diff reports.
//!
//! # Example
//!
//! ```
//! # use nimbus::{config::AppConfig, diff::DiffMode};
//! let config = AppConfig::default();
//! assert_eq!(config.graph().pseudo_parameter_prefix(), "AWS::");
//! assert_eq!(config.diff().mode(), DiffMode::Concise);
//! ```

use serde::Deserialize;

use crate::{diff::DiffMode, error::NimbusError};

/// Top-level configuration combining graph and diff settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Graph configuration section.
    #[serde(default)]
    graph: GraphConfig,

    /// Diff configuration section.
    #[serde(default)]
    diff: DiffConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] from its sections.
    pub fn new(graph: GraphConfig, diff: DiffConfig) -> Self {
        Self { graph, diff }
    }

    /// Returns the graph configuration.
    pub fn graph(&self) -> &GraphConfig {
        &self.graph
    }

    /// Returns the diff configuration.
    pub fn diff(&self) -> &DiffConfig {
        &self.diff
    }

    /// Overrides the configured diff mode.
    pub fn set_diff_mode(&mut self, mode: DiffMode) {
        self.diff.mode = mode;
    }

    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`NimbusError::Config`] for an empty pseudo-parameter prefix,
    /// which would turn every undeclared name into a pseudo-parameter.
    pub fn validate(&self) -> Result<(), NimbusError> {
        if self.graph.pseudo_parameter_prefix.is_empty() {
            return Err(NimbusError::Config(
                "graph.pseudo_parameter_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Reference discovery settings for the dependency graph.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    /// Names starting with this prefix resolve to pseudo-parameters.
    #[serde(default = "default_pseudo_parameter_prefix")]
    pseudo_parameter_prefix: String,

    /// Whether `Fn::Sub` placeholders count as references.
    #[serde(default = "default_sub_placeholders")]
    sub_placeholders: bool,
}

fn default_pseudo_parameter_prefix() -> String {
    "AWS::".to_string()
}

fn default_sub_placeholders() -> bool {
    true
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            pseudo_parameter_prefix: default_pseudo_parameter_prefix(),
            sub_placeholders: default_sub_placeholders(),
        }
    }
}

impl GraphConfig {
    /// Creates a new [`GraphConfig`].
    ///
    /// # Arguments
    ///
    /// * `pseudo_parameter_prefix` - Prefix of built-in names that need no declaration.
    /// * `sub_placeholders` - Whether `Fn::Sub` placeholders are scanned.
    pub fn new(pseudo_parameter_prefix: impl Into<String>, sub_placeholders: bool) -> Self {
        Self {
            pseudo_parameter_prefix: pseudo_parameter_prefix.into(),
            sub_placeholders,
        }
    }

    pub fn pseudo_parameter_prefix(&self) -> &str {
        &self.pseudo_parameter_prefix
    }

    pub fn sub_placeholders(&self) -> bool {
        self.sub_placeholders
    }
}

/// Diff reporting settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffConfig {
    /// Which entries a diff reports.
    #[serde(default)]
    mode: DiffMode,
}

impl DiffConfig {
    pub fn new(mode: DiffMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DiffMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_sections_use_defaults() {
        let config: AppConfig = serde_yaml::from_str("graph:\n  sub_placeholders: false\n").unwrap();
        assert!(!config.graph().sub_placeholders());
        assert_eq!(config.graph().pseudo_parameter_prefix(), "AWS::");
        assert_eq!(config.diff().mode(), DiffMode::Concise);
    }

    #[test]
    fn test_diff_mode_names() {
        let config: AppConfig = serde_yaml::from_str("diff:\n  mode: verbose\n").unwrap();
        assert_eq!(config.diff().mode(), DiffMode::Verbose);
        assert!(serde_yaml::from_str::<AppConfig>("diff:\n  mode: loud\n").is_err());
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        assert!(AppConfig::default().validate().is_ok());

        let config: AppConfig =
            serde_yaml::from_str("graph:\n  pseudo_parameter_prefix: ''\n").unwrap();
        assert!(matches!(config.validate(), Err(NimbusError::Config(_))));
    }

    #[test]
    fn test_set_diff_mode() {
        let mut config = AppConfig::default();
        config.set_diff_mode(DiffMode::Verbose);
        assert_eq!(config.diff().mode(), DiffMode::Verbose);
    }
}
