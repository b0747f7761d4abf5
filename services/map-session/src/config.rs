//! Session configuration: sync settings, HTTP timeouts and the layer catalog.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use feature_info::FeatureInfoConfig;
use layer_sync::SyncConfig;
use map_common::{LayerId, RasterLayer};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sync: SyncConfig,
    pub feature_info: FeatureInfoSettings,
    /// Layers that scripts can add by id
    pub catalog: Vec<RasterLayer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureInfoSettings {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for FeatureInfoSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 15,
            connect_timeout_secs: 5,
        }
    }
}

impl From<&FeatureInfoSettings> for FeatureInfoConfig {
    fn from(settings: &FeatureInfoSettings) -> Self {
        FeatureInfoConfig {
            request_timeout: Duration::from_secs(settings.request_timeout_secs),
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        }
    }
}

impl SessionConfig {
    /// Load from a YAML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: SessionConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config.sync.validate()?;

        info!(
            path = ?path,
            catalog = config.catalog.len(),
            "Loaded session config"
        );
        Ok(config)
    }

    /// Catalog layers for the given ids, in the order requested.
    pub fn catalog_layers(&self, ids: &[LayerId]) -> Result<Vec<RasterLayer>> {
        ids.iter()
            .map(|id| match self.catalog.iter().find(|layer| &layer.id == id) {
                Some(layer) => Ok(layer.clone()),
                None => bail!("Layer '{}' is not in the catalog", id),
            })
            .collect()
    }
}
