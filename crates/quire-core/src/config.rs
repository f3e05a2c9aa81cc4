//! Document configuration.
//!
//! ## Learning: Serde for Serialization
//!
//! Serde is Rust's standard for serialization/deserialization.
//! The `#[derive(Serialize, Deserialize)]` macro generates
//! code to convert structs to/from TOML.
//!
//! `#[serde(default)]` uses Default::default() for missing fields,
//! so a config file only needs the keys it wants to change.

use quire_buffer::NewLine;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables of a `Document`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Removed text shorter than this many characters is copied into a
    /// string; longer removals share the rope instead
    pub removed_text_copy_threshold: usize,

    /// Verify line tree and anchor invariants after every change
    pub check_invariants: bool,

    /// Delimiter suggested for new lines when the document has none yet
    pub default_newline: NewLine,
}

impl DocumentConfig {
    /// Loads config from a TOML file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parses config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serializes the config to TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            removed_text_copy_threshold: 100,
            check_invariants: cfg!(debug_assertions),
            default_newline: NewLine::default(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DocumentConfig::default();
        assert_eq!(config.removed_text_copy_threshold, 100);
        assert_eq!(config.check_invariants, cfg!(debug_assertions));
        assert_eq!(config.default_newline, NewLine::Lf);
    }

    #[test]
    fn test_config_serialization() {
        let config = DocumentConfig {
            removed_text_copy_threshold: 8,
            default_newline: NewLine::CrLf,
            ..DocumentConfig::default()
        };
        let toml = config.to_toml_string().unwrap();
        assert!(toml.contains("default_newline = \"crlf\""));
        assert_eq!(DocumentConfig::from_toml_str(&toml).unwrap(), config);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = DocumentConfig::from_toml_str("check_invariants = true\n").unwrap();
        assert!(config.check_invariants);
        assert_eq!(config.removed_text_copy_threshold, 100);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quire.toml");
        std::fs::write(&path, "removed_text_copy_threshold = 3\ndefault_newline = \"cr\"\n").unwrap();

        let config = DocumentConfig::load_from(&path).unwrap();
        assert_eq!(config.removed_text_copy_threshold, 3);
        assert_eq!(config.default_newline, NewLine::Cr);

        assert!(matches!(
            DocumentConfig::load_from(dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
        assert!(matches!(
            DocumentConfig::from_toml_str("removed_text_copy_threshold = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
