//! # Configuration File
//!
//! Optional TOML file, one section per concern. Every key has a default, so
//! an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! [repository]
//! format = "yaml"
//! max_depth = 255
//!
//! [export]
//! include_description = true
//! include_public_keys = true
//!
//! [lint]
//! require_onion_urls = true
//! allow_unknown_fields = true
//!
//! [logging]
//! filter = "warn"
//! ```

use anyhow::Context;
use oniontree_lint::LintConfig;
use oniontree_repo::{RepositoryConfig, SnapshotOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Filter used when neither the environment nor the file sets one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// The whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Engine options.
    pub repository: RepositoryConfig,

    /// Defaults for the `export` command.
    pub export: SnapshotOptions,

    /// Rule switches for the `lint` command.
    pub lint: LintConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// The `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive, e.g. `info` or
    /// `oniontree_repo=debug`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl CliConfig {
    /// Loads the file at `path`, or returns the defaults when no path is
    /// given.
    ///
    /// A path that was given but cannot be read is an error; it is never
    /// silently replaced by defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oniontree_repo::Format;
    use tempfile::TempDir;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(CliConfig::from_toml("").unwrap(), CliConfig::default());
    }

    #[test]
    fn test_full_file() {
        let config = CliConfig::from_toml(
            r#"
            [repository]
            format = "yaml"
            max_depth = 16

            [export]
            include_description = false

            [lint]
            require_onion_urls = false
            allow_unknown_fields = false

            [logging]
            filter = "oniontree_repo=debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.repository.format, Format::Yaml);
        assert_eq!(config.repository.max_depth, 16);
        assert!(!config.export.include_description);
        assert!(config.export.include_public_keys);
        assert!(!config.lint.require_onion_urls);
        assert!(!config.lint.allow_unknown_fields);
        assert_eq!(config.logging.filter, "oniontree_repo=debug");
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = CliConfig::from_toml("[repository]\nformat = \"json\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_without_path() {
        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let temp = TempDir::new().unwrap();
        let err = CliConfig::load(Some(&temp.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("oniontree.toml");
        fs::write(&path, "[logging]\nfilter = \"debug\"\n").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.repository, RepositoryConfig::default());
    }
}
