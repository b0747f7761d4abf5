//! WMS GetMap tile templates for raster sources.
//!
//! The rendering surface fills in the `{bbox-epsg-3857}` placeholder for
//! every tile it fetches, so it is appended after encoding.

use map_common::{MapResult, WmsSource};
use serde::{Deserialize, Serialize};

use crate::{append_params, WMS_VERSION};

/// Placeholder the surface substitutes with each tile's Web Mercator extent.
pub const BBOX_PLACEHOLDER: &str = "{bbox-epsg-3857}";

/// Tiles are always requested in Web Mercator.
pub const TILE_SRS: &str = "EPSG:3857";

/// Parameters of a GetMap tile request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMapTemplate {
    pub layers: String,
    pub styles: String,
    pub format: String,
    pub transparent: bool,
    pub tile_size: u32,
    pub cql_filter: Option<String>,
}

impl GetMapTemplate {
    pub fn for_source(source: &WmsSource, style: Option<&str>) -> Self {
        Self {
            layers: source.layer.clone(),
            styles: style.unwrap_or_default().to_string(),
            format: source.format.clone(),
            transparent: source.transparent,
            tile_size: source.tile_size,
            cql_filter: None,
        }
    }

    pub fn with_cql_filter(mut self, filter: Option<String>) -> Self {
        self.cql_filter = filter;
        self
    }

    fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("SERVICE", "WMS".to_string()),
            ("REQUEST", "GetMap".to_string()),
            ("VERSION", WMS_VERSION.to_string()),
            ("LAYERS", self.layers.clone()),
            ("STYLES", self.styles.clone()),
            ("FORMAT", self.format.clone()),
            ("TRANSPARENT", self.transparent.to_string().to_uppercase()),
            ("WIDTH", self.tile_size.to_string()),
            ("HEIGHT", self.tile_size.to_string()),
            ("SRS", TILE_SRS.to_string()),
        ];
        if let Some(filter) = &self.cql_filter {
            params.push(("CQL_FILTER", filter.clone()));
        }
        params
    }

    /// Tile URL template for the surface's raster source.
    pub fn to_tile_url(&self, base_url: &str) -> MapResult<String> {
        let url = append_params(base_url, self.query_params())?;
        Ok(format!("{}&BBOX={}", url, BBOX_PLACEHOLDER))
    }
}
