//! # Property Configuration
//!
//! Document-level options applied to cells as they are added to a bag.
//! Stored as TOML.

use std::path::Path;

use docprop_stream::StreamConfig;
use serde::{Deserialize, Serialize};

use crate::error::{PropertyError, Result};
use crate::notify::PropertyStatus;
use crate::property::{Property, PropertyKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyConfig {
    /// Writer formatting
    pub stream: StreamConfig,

    /// Float lists write their side files as `f32`. Reader and writer must agree.
    pub single_precision_float_lists: bool,

    /// Name of the XML entry in a document archive
    pub document_file_name: String,
}

impl Default for PropertyConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            single_precision_float_lists: false,
            document_file_name: "Document.xml".to_string(),
        }
    }
}

impl PropertyConfig {
    /// Load from a TOML file, falling back to defaults
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Failed to parse property config: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read property config: {}", e),
            }
        }
        Self::default()
    }

    /// Save to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| PropertyError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set the status bits this configuration implies on `cell`
    pub fn apply(&self, cell: &mut dyn Property) {
        if cell.kind() == PropertyKind::FloatList {
            cell.core_mut()
                .set_status(PropertyStatus::SINGLE_PRECISION, self.single_precision_float_lists);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("docprop.toml");
        let config = PropertyConfig {
            single_precision_float_lists: true,
            ..PropertyConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(PropertyConfig::load_or_default(&path), config);
    }

    #[test]
    fn test_missing_or_broken_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert_eq!(PropertyConfig::load_or_default(&path), PropertyConfig::default());

        std::fs::write(&path, "single_precision_float_lists = [").unwrap();
        assert_eq!(PropertyConfig::load_or_default(&path), PropertyConfig::default());
    }

    #[test]
    fn test_apply_marks_float_lists_only() {
        let config = PropertyConfig {
            single_precision_float_lists: true,
            ..PropertyConfig::default()
        };
        let mut floats = PropertyKind::FloatList.create("Weights");
        let mut ints = PropertyKind::IntegerList.create("Ids");
        config.apply(floats.as_mut());
        config.apply(ints.as_mut());
        assert!(floats.core().test_status(PropertyStatus::SINGLE_PRECISION));
        assert!(!ints.core().test_status(PropertyStatus::SINGLE_PRECISION));
    }
}
