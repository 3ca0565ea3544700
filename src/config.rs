//! Bridge configuration
//!
//! Loaded from TOML. Every section and key is optional; missing values take
//! the defaults shown in [`DEFAULT_CONFIG`].

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// The configuration every default value comes from, as a TOML document
pub const DEFAULT_CONFIG: &str = r#"
[routing]
# Instance base paths are /<url_prefix>/<instance id>/
url_prefix = "django_plotly_dash"

[instances]
# Namespace component ids as <instance id>_-_<id>
adjust_ids = false
# What registering a second template under a taken name does: overwrite | error
on_template_collision = "overwrite"

[logging]
level = "info"
"#;

/// What happens when a template name is registered twice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Last registration wins
    #[default]
    Overwrite,
    /// The second registration fails with a duplicate error
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub url_prefix: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            url_prefix: "django_plotly_dash".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InstanceConfig {
    pub adjust_ids: bool,
    pub on_template_collision: CollisionPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration for the registry and the instances it creates
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub routing: RoutingConfig,
    pub instances: InstanceConfig,
    pub logging: LoggingConfig,
}

impl BridgeConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the path prefix of instance base paths
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.routing.url_prefix = prefix.into();
        self
    }

    /// Set whether instances namespace component ids by default
    pub fn with_adjust_ids(mut self, adjust_ids: bool) -> Self {
        self.instances.adjust_ids = adjust_ids;
        self
    }

    /// Set the template name collision policy
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.instances.on_template_collision = policy;
        self
    }

    /// Set the default log filter
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// Base URL path of the instance `id`: `/<prefix>/<id>/`
    pub fn base_pathname(&self, id: &str) -> String {
        let prefix = self.routing.url_prefix.trim_matches('/');
        if prefix.is_empty() {
            format!("/{}/", id)
        } else {
            format!("/{}/{}/", prefix, id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_matches_default() {
        let parsed = BridgeConfig::from_str(DEFAULT_CONFIG).expect("Should parse");
        assert_eq!(parsed, BridgeConfig::default());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let parsed = BridgeConfig::from_str("").expect("Should parse");
        assert_eq!(parsed, BridgeConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let toml_str = r#"
[instances]
adjust_ids = true
on_template_collision = "error"
"#;
        let config = BridgeConfig::from_str(toml_str).expect("Should parse");
        assert!(config.instances.adjust_ids);
        assert_eq!(config.instances.on_template_collision, CollisionPolicy::Error);
        assert_eq!(config.routing.url_prefix, "django_plotly_dash");
    }

    #[test]
    fn test_invalid_policy_error() {
        let result = BridgeConfig::from_str("[instances]\non_template_collision = \"ignore\"\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_base_pathname() {
        let config = BridgeConfig::new();
        assert_eq!(config.base_pathname("calc"), "/django_plotly_dash/calc/");
        assert_eq!(config.with_url_prefix("/apps/").base_pathname("x"), "/apps/x/");
        assert_eq!(BridgeConfig::new().with_url_prefix("").base_pathname("x"), "/x/");
    }

    #[test]
    fn test_builder_pattern() {
        let config = BridgeConfig::new()
            .with_adjust_ids(true)
            .with_collision_policy(CollisionPolicy::Error)
            .with_log_level("debug");
        assert!(config.instances.adjust_ids);
        assert_eq!(config.instances.on_template_collision, CollisionPolicy::Error);
        assert_eq!(config.logging.level, "debug");
    }
}
