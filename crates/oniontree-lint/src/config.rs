//! Linter configuration, the `[lint]` section of the configuration file.

use serde::{Deserialize, Serialize};

/// Switches for the optional lint rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    /// Every URL host must be a v2 or v3 `.onion` name.
    pub require_onion_urls: bool,

    /// Fields the record format does not define are accepted.
    pub allow_unknown_fields: bool,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            require_onion_urls: true,
            allow_unknown_fields: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LintConfig::default();
        assert!(config.require_onion_urls);
        assert!(config.allow_unknown_fields);
    }

    #[test]
    fn test_partial_section() {
        let config: LintConfig =
            serde_json::from_str(r#"{"allow_unknown_fields": false}"#).unwrap();
        assert!(config.require_onion_urls);
        assert!(!config.allow_unknown_fields);
    }
}
