//! Error types for map layer synchronization.

use thiserror::Error;

/// Result type alias using MapError.
pub type MapResult<T> = Result<T, MapError>;

/// Primary error type for layer state, protocol and surface operations.
#[derive(Debug, Error)]
pub enum MapError {
    // === Layer state errors ===
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    #[error("Duplicate layer id: {0}")]
    DuplicateLayer(String),

    #[error("Index {index} out of bounds for {len} layers")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Opacity must be within [0, 1], got {0}")]
    InvalidOpacity(f64),

    // === Protocol errors ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid BBOX: {0}")]
    InvalidBbox(String),

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Parse(String),

    // === Surface errors ===
    #[error("Surface rejected operation: {0}")]
    Surface(String),

    #[error("Surface was detached before it became ready")]
    SurfaceDetached,

    #[error("Layer sync for '{0}' was already removed")]
    SyncRemoved(String),

    // === Configuration errors ===
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for MapError {
    fn from(err: serde_json::Error) -> Self {
        MapError::Parse(format!("JSON error: {}", err))
    }
}
