//! Layout configuration
//!
//! Spacing constants used by the layout engine, loadable from a TOML file.
//! Every field is optional in the file and falls back to its default.
//!
//! ```toml
//! horizontal_gap = 50.0
//! vertical_gap = 75.0
//!
//! [default_node_size]
//! width = 250.0
//! height = 110.0
//! ```

use crate::layout::engine::{NodeDimensions, Position};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading a layout configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read layout config {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse layout config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid layout config: {field} must be {expected}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Space between siblings on one level
    pub horizontal_gap: f64,
    /// Space between the tallest node of a level and the next level
    pub vertical_gap: f64,
    /// Root x of the first CTE cluster
    pub cte_origin_x: f64,
    /// Horizontal distance between consecutive CTE roots
    pub cte_step_x: f64,
    /// Root y of every CTE cluster
    pub cte_origin_y: f64,
    /// Size assumed for nodes by callers that cannot measure them
    pub default_node_size: NodeDimensions,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_gap: 50.0,
            vertical_gap: 75.0,
            cte_origin_x: -500.0,
            cte_step_x: 400.0,
            cte_origin_y: -200.0,
            default_node_size: NodeDimensions::new(250.0, 110.0),
        }
    }
}

impl LayoutConfig {
    /// Reads and validates a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded layout config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = [
            ("horizontal_gap", self.horizontal_gap),
            ("vertical_gap", self.vertical_gap),
            ("default_node_size.width", self.default_node_size.width),
            ("default_node_size.height", self.default_node_size.height),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    expected: "a finite, non-negative number",
                });
            }
        }

        let offsets = [
            ("cte_origin_x", self.cte_origin_x),
            ("cte_step_x", self.cte_step_x),
            ("cte_origin_y", self.cte_origin_y),
        ];
        match offsets.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((field, _)) => Err(ConfigError::Invalid {
                field,
                expected: "a finite number",
            }),
            None => Ok(()),
        }
    }

    /// Where the root of the CTE at `index` is placed
    pub fn cte_anchor(&self, index: usize) -> Position {
        Position {
            x: self.cte_origin_x + index as f64 * self.cte_step_x,
            y: self.cte_origin_y,
        }
    }
}
