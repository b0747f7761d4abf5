//! Common fixtures for layer state and feature-info tests.

use map_common::{DrawnFeature, RasterLayer, WmsSource};
use serde_json::{json, Value};

/// WMS endpoint used by fixture layers. Never contacted.
pub const FIXTURE_WMS_URL: &str = "https://maps.example.org/geoserver/wms";

/// A plain raster layer whose WMS layer name is `ws:<id>`.
pub fn raster_layer(id: &str) -> RasterLayer {
    RasterLayer::new(id, WmsSource::new(FIXTURE_WMS_URL, format!("ws:{}", id)))
}

/// A raster layer that follows the selected timestamp.
pub fn time_layer(id: &str) -> RasterLayer {
    raster_layer(id).with_time_filter(true)
}

/// A raster layer drawing from an explicitly shared surface source.
pub fn shared_source_layer(id: &str, source_id: &str) -> RasterLayer {
    let mut layer = raster_layer(id);
    layer.source.source_id = Some(source_id.to_string());
    layer
}

/// Raster layers for the given ids, in order.
pub fn raster_layers(ids: &[&str]) -> Vec<RasterLayer> {
    ids.iter().map(|id| raster_layer(id)).collect()
}

/// A drawn square area keyed by `area_id`.
pub fn drawn_feature(area_id: &str) -> DrawnFeature {
    DrawnFeature::new(
        area_id,
        json!({
            "type": "Polygon",
            "coordinates": [[[4.0, 51.0], [5.0, 51.0], [5.0, 52.0], [4.0, 52.0], [4.0, 51.0]]]
        }),
    )
}

/// A GeoJSON feature as returned by GetFeatureInfo.
pub fn wms_feature(native_id: Value, properties: Value) -> Value {
    json!({
        "type": "Feature",
        "id": native_id,
        "geometry": {"type": "Point", "coordinates": [5.0, 52.0]},
        "properties": properties,
    })
}

/// A GetFeatureInfo JSON body holding the given features.
pub fn feature_collection_body(features: Vec<Value>) -> String {
    json!({
        "type": "FeatureCollection",
        "features": features,
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::4326"}},
    })
    .to_string()
}
