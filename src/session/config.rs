// Session configuration

use crate::layer::DEFAULT_LAYER_BASE_NAME;
use crate::session::error::{DocumentError, DocumentResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings applied when a document session is opened
///
/// Missing fields take their default, so a RON file only has to list what
/// it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base of synthesized layer names
    pub layer_base_name: String,
    /// Name of the layer every new document starts with
    pub default_layer_name: String,
    /// `data-color` given to that first layer
    pub default_layer_color: Option<String>,
    /// Maximum number of undo entries, unlimited when `None`
    pub max_history: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layer_base_name: DEFAULT_LAYER_BASE_NAME.to_string(),
            default_layer_name: format!("{} 1", DEFAULT_LAYER_BASE_NAME),
            default_layer_color: Some("#333333".to_string()),
            max_history: None,
        }
    }
}

impl SessionConfig {
    pub fn from_ron(ron_data: &str) -> DocumentResult<Self> {
        ron::from_str(ron_data).map_err(|e| {
            DocumentError::SerializationError(format!("Failed to parse config: {}", e))
        })
    }

    pub fn to_ron(&self) -> DocumentResult<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Load a config file written in RON
    pub fn load(path: &Path) -> DocumentResult<Self> {
        let ron_data = std::fs::read_to_string(path)?;
        Self::from_ron(&ron_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.layer_base_name, "Layer");
        assert_eq!(config.default_layer_name, "Layer 1");
        assert_eq!(config.default_layer_color.as_deref(), Some("#333333"));
        assert_eq!(config.max_history, None);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = SessionConfig::from_ron("(max_history: Some(50))").unwrap();

        assert_eq!(config.max_history, Some(50));
        assert_eq!(config.default_layer_name, "Layer 1");
    }

    #[test]
    fn test_ron_round_trip() {
        let config = SessionConfig {
            layer_base_name: "Ebene".to_string(),
            default_layer_name: "Gravur".to_string(),
            default_layer_color: None,
            max_history: Some(10),
        };

        let ron_data = config.to_ron().unwrap();
        assert_eq!(SessionConfig::from_ron(&ron_data).unwrap(), config);
    }

    #[test]
    fn test_invalid_ron() {
        let result = SessionConfig::from_ron("(max_history: \"lots\")");
        assert!(matches!(result, Err(DocumentError::SerializationError(_))));
    }
}
