//! Raster layer definitions and drawn features.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The WMS service a raster layer draws its tiles from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WmsSource {
    /// Base URL of the WMS endpoint
    pub url: String,

    /// Layer name as published by the WMS server (e.g. "workspace:layer")
    pub layer: String,

    /// Surface source id; layers that share it also share one surface source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Requested image format
    #[serde(default = "default_format")]
    pub format: String,

    /// Tile edge in pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,

    #[serde(default = "default_transparent")]
    pub transparent: bool,
}

fn default_format() -> String {
    "image/png".to_string()
}

fn default_tile_size() -> u32 {
    256
}

fn default_transparent() -> bool {
    true
}

impl WmsSource {
    pub fn new(url: impl Into<String>, layer: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            layer: layer.into(),
            source_id: None,
            format: default_format(),
            tile_size: default_tile_size(),
            transparent: default_transparent(),
        }
    }
}

/// A WMS-backed raster layer as held in the ordered layer list.
///
/// Position in the list is paint order; equality is full value equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterLayer {
    pub id: LayerId,

    /// Human-readable title
    #[serde(default)]
    pub name: String,

    pub source: WmsSource,

    /// Whether the layer follows the selected timestamp
    #[serde(default, alias = "timeFilter")]
    pub time_filter: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,

    /// Named WMS style
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

impl RasterLayer {
    pub fn new(id: impl Into<String>, source: WmsSource) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id: LayerId(id),
            source,
            time_filter: false,
            opacity: None,
            style: None,
        }
    }

    pub fn with_time_filter(mut self, time_filter: bool) -> Self {
        self.time_filter = time_filter;
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

/// Interactive drawing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawMode {
    Point,
    Line,
    Polygon,
    Rectangle,
}

/// A user-drawn area, keyed by its `gebiedid` property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnFeature {
    #[serde(rename = "type", default = "feature_type")]
    pub feature_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default)]
    pub geometry: Value,

    pub properties: DrawnFeatureProperties,
}

fn feature_type() -> String {
    "Feature".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawnFeatureProperties {
    /// Area id, unique within the drawn-feature collection
    #[serde(rename = "gebiedid", deserialize_with = "string_or_number")]
    pub area_id: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DrawnFeature {
    pub fn new(area_id: impl Into<String>, geometry: Value) -> Self {
        Self {
            feature_type: feature_type(),
            id: None,
            geometry,
            properties: DrawnFeatureProperties {
                area_id: area_id.into(),
                extra: Map::new(),
            },
        }
    }

    pub fn area_id(&self) -> &str {
        &self.properties.area_id
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "gebiedid must be a string or number, got {}",
            other
        ))),
    }
}
