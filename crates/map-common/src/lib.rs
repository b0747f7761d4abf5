//! Common types shared across the map layer sync crates.

pub mod bbox;
pub mod error;
pub mod layer;
pub mod time;

pub use bbox::{BoundingBox, LngLat, LngLatBounds, POINT_QUERY_EPSILON};
pub use error::{MapError, MapResult};
pub use layer::{DrawMode, DrawnFeature, DrawnFeatureProperties, LayerId, RasterLayer, WmsSource};
pub use time::{TimeRange, TimeWindow, MAX_WINDOW_HOURS};
