//! WMS GetFeatureInfo request building.
//!
//! Builds the query URL for looking up the feature under a clicked point
//! or inside a selected area. The pixel grid is virtual: the bounding box is
//! mapped onto a `width` x `height` image and the feature at pixel (`x`, `y`)
//! is returned.

use map_common::{BoundingBox, LngLat, LngLatBounds, MapResult};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{append_params, WMS_VERSION};

pub const DEFAULT_PIXEL_X: u32 = 50;
pub const DEFAULT_PIXEL_Y: u32 = 50;
pub const DEFAULT_PIXEL_WIDTH: u32 = 110;
pub const DEFAULT_PIXEL_HEIGHT: u32 = 110;

/// Spatial reference for feature lookups.
pub const QUERY_CRS: &str = "EPSG:4326";

/// Response format; results are parsed as a GeoJSON feature collection.
pub const INFO_FORMAT: &str = "application/json";

/// GetFeatureInfo request parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfoRequest {
    /// Layer to query; sent as both LAYERS and QUERY_LAYERS
    pub layer: String,
    /// Query area in EPSG:4326
    pub bbox: BoundingBox,
    /// Pixel column
    pub x: u32,
    /// Pixel row
    pub y: u32,
    /// Virtual map width in pixels
    pub width: u32,
    /// Virtual map height in pixels
    pub height: u32,
}

impl FeatureInfoRequest {
    /// Request with the default pixel grid.
    pub fn new(layer: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            layer: layer.into(),
            bbox,
            x: DEFAULT_PIXEL_X,
            y: DEFAULT_PIXEL_Y,
            width: DEFAULT_PIXEL_WIDTH,
            height: DEFAULT_PIXEL_HEIGHT,
        }
    }

    /// Request for a point or area selection; `None` when neither is given.
    pub fn for_selection(
        layer: impl Into<String>,
        point: Option<LngLat>,
        bounds: Option<&LngLatBounds>,
    ) -> Option<Self> {
        BoundingBox::for_query(point, bounds).map(|bbox| Self::new(layer, bbox))
    }

    pub fn with_pixel(mut self, x: u32, y: u32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// KVP parameters in wire order.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("SERVICE", "WMS".to_string()),
            ("REQUEST", "GetFeatureInfo".to_string()),
            ("VERSION", WMS_VERSION.to_string()),
            ("INFO_FORMAT", INFO_FORMAT.to_string()),
            ("CRS", QUERY_CRS.to_string()),
            ("LAYERS", self.layer.clone()),
            ("QUERY_LAYERS", self.layer.clone()),
            ("WIDTH", self.width.to_string()),
            ("HEIGHT", self.height.to_string()),
            ("X", self.x.to_string()),
            ("Y", self.y.to_string()),
            ("BBOX", self.bbox.to_wms_string()),
        ]
    }

    /// Full request URL against `base_url`.
    pub fn to_url(&self, base_url: &str) -> MapResult<Url> {
        append_params(base_url, self.query_params())
    }
}
