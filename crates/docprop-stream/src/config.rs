//! # Stream Configuration
//!
//! Formatting options for the XML writer.

use serde::{Deserialize, Serialize};

/// Writer formatting options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Spaces per indentation level
    pub indent_width: usize,

    /// Write every value inline in the XML instead of into side files
    pub force_xml: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            indent_width: 4,
            force_xml: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: StreamConfig = toml::from_str("force_xml = true").unwrap();
        assert!(config.force_xml);
        assert_eq!(config.indent_width, 4);
    }
}
