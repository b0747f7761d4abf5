//! Layer synchronization settings.
//!
//! Loaded from YAML; every field has a default so a partial (or empty) file
//! is valid.

use std::path::Path;

use map_common::{LayerId, MapError, MapResult, TimeWindow, MAX_WINDOW_HOURS};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Anchor layer added by the draw plugin; raster layers stay below it.
pub const DEFAULT_SENTINEL_LAYER_ID: &str = "gl-draw-polygon-fill-inactive.cold";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Layer that raster layers are inserted below when they have no anchor
    pub sentinel_layer_id: String,

    /// Opacity for layers that do not set their own
    pub default_opacity: f64,

    /// How the selected timestamp filters time-aware layers
    pub time_window: TimeWindow,

    /// Layers that respond to clicks even when they are not the filter target
    pub clickable_layers: Vec<LayerId>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sentinel_layer_id: DEFAULT_SENTINEL_LAYER_ID.to_string(),
            default_opacity: 1.0,
            time_window: TimeWindow::default(),
            clickable_layers: Vec::new(),
        }
    }
}

impl SyncConfig {
    pub fn from_yaml_str(content: &str) -> MapResult<Self> {
        let config: SyncConfig = serde_yaml::from_str(content)
            .map_err(|e| MapError::Config(format!("Failed to parse sync config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> MapResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| MapError::Config(format!("Failed to read {:?}: {}", path, e)))?;
        let config = Self::from_yaml_str(&content)?;
        info!(path = ?path, sentinel = %config.sentinel_layer_id, "Loaded sync config");
        Ok(config)
    }

    pub fn validate(&self) -> MapResult<()> {
        if !(0.0..=1.0).contains(&self.default_opacity) {
            return Err(MapError::InvalidOpacity(self.default_opacity));
        }
        if self.sentinel_layer_id.is_empty() {
            return Err(MapError::Config("sentinel_layer_id must not be empty".to_string()));
        }
        if !(1..=MAX_WINDOW_HOURS).contains(&self.time_window.hours) {
            return Err(MapError::Config(format!(
                "time_window.hours must be within 1..={}, got {}",
                MAX_WINDOW_HOURS, self.time_window.hours
            )));
        }
        Ok(())
    }

    pub fn is_clickable(&self, id: &LayerId) -> bool {
        self.clickable_layers.contains(id)
    }
}
