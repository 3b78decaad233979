//! CLI configuration file

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings read from `--config <FILE>` (YAML)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Directory laid out as `<version>/<name>.json` (default: bundled schemas)
    pub schema_dir: Option<PathBuf>,
    /// Schema version used when a command does not pass one
    pub default_version: Option<String>,
    /// Algorithm for `digest` (default: sha256)
    pub digest_algorithm: String,
    /// Log filter used when `RUST_LOG` is unset (default: warn)
    pub log_level: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            schema_dir: None,
            default_version: None,
            digest_algorithm: "sha256".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl CliConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, is not YAML, or has unknown keys.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse configuration from YAML text; an empty document gives the defaults.
    ///
    /// # Errors
    ///
    /// Fails on malformed YAML and unknown keys.
    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply command-line overrides; flags that were not given keep the
    /// configured value.
    #[must_use]
    pub fn with_overrides(
        self,
        schema_dir: Option<PathBuf>,
        default_version: Option<String>,
        digest_algorithm: Option<String>,
        log_level: Option<String>,
    ) -> Self {
        let mut config = self;
        if let Some(dir) = schema_dir {
            config = config.schema_dir(dir);
        }
        if let Some(version) = default_version {
            config = config.default_version(version);
        }
        if let Some(algorithm) = digest_algorithm {
            config = config.digest_algorithm(algorithm);
        }
        if let Some(level) = log_level {
            config = config.log_level(level);
        }
        config
    }

    /// Set the schema directory
    #[must_use]
    pub fn schema_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.schema_dir = Some(dir.into());
        self
    }

    /// Set the default schema version
    #[must_use]
    pub fn default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = Some(version.into());
        self
    }

    /// Set the digest algorithm
    #[must_use]
    pub fn digest_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.digest_algorithm = algorithm.into();
        self
    }

    /// Set the log level
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CliConfig::new();
        assert!(config.schema_dir.is_none());
        assert!(config.default_version.is_none());
        assert_eq!(config.digest_algorithm, "sha256");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = CliConfig::from_yaml("digest_algorithm: sha512\ndefault_version: 1.0.0\n").unwrap();
        assert_eq!(config.digest_algorithm, "sha512");
        assert_eq!(config.default_version.as_deref(), Some("1.0.0"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_empty_yaml() {
        assert_eq!(CliConfig::from_yaml("  \n").unwrap(), CliConfig::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = CliConfig::from_yaml("schema_directory: /tmp\n").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
        assert!(CliConfig::from_yaml("array_backends: [numpy]\n").is_err());
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let config = CliConfig::from_yaml("digest_algorithm: sha512\nlog_level: info\n")
            .unwrap()
            .with_overrides(None, Some("1.0.0".to_string()), Some("md5".to_string()), None);
        assert_eq!(config.digest_algorithm, "md5");
        assert_eq!(config.default_version.as_deref(), Some("1.0.0"));
        assert_eq!(config.log_level, "info");
        assert!(config.schema_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = CliConfig::new()
            .schema_dir("/opt/schemas")
            .default_version("1.0.0")
            .digest_algorithm("sha384")
            .log_level("debug");
        assert_eq!(config.schema_dir, Some(PathBuf::from("/opt/schemas")));
        assert_eq!(config.default_version.as_deref(), Some("1.0.0"));
        assert_eq!(config.digest_algorithm, "sha384");
        assert_eq!(config.log_level, "debug");
    }
}
