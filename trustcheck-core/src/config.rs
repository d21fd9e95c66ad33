//! Verifier configuration
//!
//! Loaded from an optional `trustcheck.yml`. Every field has a default, so a
//! missing file or an empty document yields the standard behavior.

use crate::qual::{QualifierKind, QualifierRegistry};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Conventional configuration file name
pub const CONFIG_FILE: &str = "trustcheck.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Check each call argument against the callee's level, not just the
    /// receiver
    pub check_arguments: bool,

    /// Index declared method levels before checking any call
    pub index_methods: bool,

    /// Active qualifier kinds
    pub qualifiers: Vec<QualifierKind>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            check_arguments: true,
            index_methods: false,
            qualifiers: QualifierKind::ALL.to_vec(),
        }
    }
}

impl VerifierConfig {
    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config YAML: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml_ng::from_str(content)?)
    }

    pub fn registry(&self) -> QualifierRegistry {
        QualifierRegistry::new(self.qualifiers.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = VerifierConfig::load(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, VerifierConfig::default());
        assert!(config.check_arguments);
        assert!(!config.index_methods);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "check_arguments: false\nqualifiers: [trust, trust_requirement]\n")
            .unwrap();

        let config = VerifierConfig::load(&path).unwrap();
        assert!(!config.check_arguments);
        assert!(!config.index_methods);

        let registry = config.registry();
        assert!(registry.is_active(QualifierKind::Trust));
        assert!(!registry.is_active(QualifierKind::TrustType));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(VerifierConfig::from_yaml("\n").unwrap(), VerifierConfig::default());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "qualifiers: [untrusted]\n").unwrap();

        let err = VerifierConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE));
    }
}
