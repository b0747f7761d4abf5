//! Parsing GetFeatureInfo JSON responses.

use map_common::{MapError, MapResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property that carries the stable id of a measurement location.
pub const MEASUREMENT_OBJECT_PROPERTY: &str = "measurementobject";

/// Stable feature identifier: the measurement object when known, else the
/// feature's native id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Text(String),
    Number(serde_json::Number),
}

impl FeatureId {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(FeatureId::Text(s.clone())),
            Value::Number(n) => Some(FeatureId::Number(n.clone())),
            _ => None,
        }
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureId::Text(s) => f.write_str(s),
            FeatureId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// The first feature of a GetFeatureInfo response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureInfoResult {
    pub id: FeatureId,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Remaining GeoJSON members (type, geometry, ...)
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Value>,
}

/// Stable id for a GeoJSON-like feature.
///
/// Prefers a non-empty `properties.measurementobject`, falls back to `id`.
pub fn extract_feature_id(feature: &Value) -> Option<FeatureId> {
    feature
        .get("properties")
        .and_then(|props| props.get(MEASUREMENT_OBJECT_PROPERTY))
        .and_then(FeatureId::from_value)
        .or_else(|| feature.get("id").and_then(FeatureId::from_value))
}

/// Parse a response body and pick its first feature.
pub fn parse_feature_info(body: &[u8]) -> MapResult<FeatureInfoResult> {
    let collection: FeatureCollection = serde_json::from_slice(body)?;

    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| MapError::Parse("response contains no features".to_string()))?;

    let id = extract_feature_id(&feature)
        .ok_or_else(|| MapError::Parse("feature has no usable id".to_string()))?;

    let Value::Object(mut members) = feature else {
        return Err(MapError::Parse("feature is not a JSON object".to_string()));
    };

    members.remove("id");
    let properties = match members.remove("properties") {
        Some(Value::Object(props)) => props,
        _ => Map::new(),
    };

    Ok(FeatureInfoResult {
        id,
        properties,
        rest: members,
    })
}
