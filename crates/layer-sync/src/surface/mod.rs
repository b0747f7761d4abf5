//! The imperative map surface that layers are synchronized against.
//!
//! The surface is an external collaborator. Only the primitives needed for
//! layer synchronization are modeled: layer add/remove/move, paint
//! properties, source cleanup, per-layer event listeners and the canvas
//! cursor.

mod memory;
mod slot;

use std::sync::Arc;

use map_common::{LayerId, LngLat, MapResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

pub use memory::{InMemorySurface, SurfaceOp};
pub use slot::SurfaceSlot;

/// Shared, exclusively-locked access to the surface.
///
/// Every add/remove/move sequence for one layer runs under a single lock so
/// sequences from different layers never interleave.
pub type SurfaceHandle = Arc<Mutex<dyn Surface>>;

/// Render type of a surface layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Raster,
    Fill,
    Line,
    Circle,
    Symbol,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Raster => "raster",
            LayerKind::Fill => "fill",
            LayerKind::Line => "line",
            LayerKind::Circle => "circle",
            LayerKind::Symbol => "symbol",
        }
    }

    /// Paint property controlling opacity, e.g. `raster-opacity`.
    pub fn opacity_property(&self) -> String {
        format!("{}-opacity", self.as_str())
    }
}

/// Tiled source a surface layer draws from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub tiles: Vec<String>,
    pub tile_size: u32,
}

/// Surface-native description of one layer, source included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceLayerSpec {
    pub id: LayerId,
    pub kind: LayerKind,
    pub source: SourceSpec,
    #[serde(default)]
    pub paint: Map<String, Value>,
}

/// A layer as currently present in the surface style.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLayer {
    pub id: String,
    pub kind: LayerKind,
    pub source: Option<String>,
}

/// Pointer events that can be bound to a single layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerEventKind {
    Click,
    MouseEnter,
    MouseLeave,
}

/// A pointer event delivered to a layer listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEvent {
    pub kind: LayerEventKind,
    pub layer_id: String,
    #[serde(default)]
    pub lng_lat: Option<LngLat>,
    #[serde(default)]
    pub features: Vec<Value>,
}

impl LayerEvent {
    pub fn new(kind: LayerEventKind, layer_id: impl Into<String>) -> Self {
        Self {
            kind,
            layer_id: layer_id.into(),
            lng_lat: None,
            features: Vec::new(),
        }
    }

    pub fn at(mut self, lng_lat: LngLat) -> Self {
        self.lng_lat = Some(lng_lat);
        self
    }
}

/// The drawing canvas; only the cursor style is exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Canvas {
    pub cursor: String,
}

/// Listener invoked with the event and the surface canvas.
pub type LayerHandler = Arc<dyn Fn(&LayerEvent, &mut Canvas) + Send + Sync>;

/// Handle for unbinding a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Imperative primitives of the map rendering engine.
pub trait Surface: Send {
    fn get_layer(&self, id: &str) -> Option<SurfaceLayer>;

    /// Insert a layer below `before_id`, or on top when `None`.
    ///
    /// The layer's source is created if the surface does not have it yet.
    fn add_layer(&mut self, spec: &SurfaceLayerSpec, before_id: Option<&str>) -> MapResult<()>;

    fn remove_layer(&mut self, id: &str) -> MapResult<()>;

    /// Move a layer below `before_id`, or to the top when `None`.
    fn move_layer(&mut self, id: &str, before_id: Option<&str>) -> MapResult<()>;

    fn set_paint_property(&mut self, id: &str, property: &str, value: Value) -> MapResult<()>;

    /// All style layers, bottom to top.
    fn style_layers(&self) -> Vec<SurfaceLayer>;

    fn remove_source(&mut self, source_id: &str) -> MapResult<()>;

    fn on(&mut self, kind: LayerEventKind, layer_id: &str, handler: LayerHandler) -> ListenerId;

    fn off(&mut self, kind: LayerEventKind, layer_id: &str, listener: ListenerId);

    fn canvas(&mut self) -> &mut Canvas;
}
