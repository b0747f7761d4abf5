//! Geographic points, extents and WMS bounding boxes.

use serde::{Deserialize, Serialize};

/// Padding in degrees applied around a clicked point for feature lookups.
pub const POINT_QUERY_EPSILON: f64 = 0.001;

/// A longitude/latitude pair in EPSG:4326 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

/// A rectangular map extent given by its south-west and north-east corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLatBounds {
    #[serde(alias = "_sw")]
    pub sw: LngLat,
    #[serde(alias = "_ne")]
    pub ne: LngLat,
}

impl LngLatBounds {
    pub fn new(sw: LngLat, ne: LngLat) -> Self {
        Self { sw, ne }
    }
}

/// A geographic bounding box in EPSG:4326 degrees.
///
/// Serialized for WMS as `minLng,minLat,maxLng,maxLat` (1.1.1 axis order).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box around a single clicked point, padded by [`POINT_QUERY_EPSILON`].
    pub fn around_point(point: LngLat) -> Self {
        Self {
            min_x: point.lng - POINT_QUERY_EPSILON,
            min_y: point.lat - POINT_QUERY_EPSILON,
            max_x: point.lng + POINT_QUERY_EPSILON,
            max_y: point.lat + POINT_QUERY_EPSILON,
        }
    }

    /// Box covering an area selection, taken corner for corner.
    pub fn from_bounds(bounds: &LngLatBounds) -> Self {
        Self {
            min_x: bounds.sw.lng,
            min_y: bounds.sw.lat,
            max_x: bounds.ne.lng,
            max_y: bounds.ne.lat,
        }
    }

    /// Pick the query box for a feature lookup.
    ///
    /// A point selection wins over an area selection when both are present.
    pub fn for_query(point: Option<LngLat>, bounds: Option<&LngLatBounds>) -> Option<Self> {
        match (point, bounds) {
            (Some(point), _) => Some(Self::around_point(point)),
            (None, Some(bounds)) => Some(Self::from_bounds(bounds)),
            (None, None) => None,
        }
    }

    /// Parse a WMS BBOX parameter string: "minx,miny,maxx,maxy"
    pub fn from_wms_string(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let parse = |part: &str| {
            part.parse::<f64>()
                .map_err(|_| BboxParseError::InvalidNumber(part.to_string()))
        };

        Ok(Self {
            min_x: parse(parts[0])?,
            min_y: parse(parts[1])?,
            max_x: parse(parts[2])?,
            max_y: parse(parts[3])?,
        })
    }

    /// Format as a WMS BBOX value.
    ///
    /// Uses the shortest representation that round-trips, so whole degrees
    /// print without a fraction (`4`) and padded points stay compact (`4.999`).
    pub fn to_wms_string(&self) -> String {
        format!("{},{},{},{}", self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wms_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}

impl From<BboxParseError> for crate::MapError {
    fn from(err: BboxParseError) -> Self {
        crate::MapError::InvalidBbox(err.to_string())
    }
}
