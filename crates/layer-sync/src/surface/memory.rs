//! A headless surface that keeps the style in memory.
//!
//! Mirrors the failure behavior of a real map engine: adding a duplicate
//! layer, anchoring on a missing layer, redefining an existing source or
//! removing a source that is still in use are all errors. Every mutation is appended to an operation log.

use std::collections::BTreeMap;

use map_common::{MapError, MapResult};
use serde_json::{Map, Value};
use tracing::trace;

use super::{
    Canvas, LayerEvent, LayerEventKind, LayerHandler, LayerKind, ListenerId, SourceSpec,
    Surface, SurfaceLayer, SurfaceLayerSpec,
};

/// Source id used by the draw plugin's layers.
const DRAW_SOURCE_ID: &str = "mapbox-gl-draw-cold";

/// One recorded surface mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOp {
    AddLayer { id: String, before: Option<String> },
    RemoveLayer(String),
    MoveLayer { id: String, before: Option<String> },
    SetPaint { id: String, property: String, value: Value },
    RemoveSource(String),
    On { kind: LayerEventKind, layer_id: String },
    Off { kind: LayerEventKind, layer_id: String },
}

#[derive(Debug, Clone)]
struct StyleLayer {
    id: String,
    kind: LayerKind,
    source: Option<String>,
    paint: Map<String, Value>,
}

struct Listener {
    id: ListenerId,
    kind: LayerEventKind,
    layer_id: String,
    handler: LayerHandler,
}

#[derive(Default)]
pub struct InMemorySurface {
    layers: Vec<StyleLayer>,
    sources: BTreeMap<String, SourceSpec>,
    listeners: Vec<Listener>,
    next_listener: u64,
    canvas: Canvas,
    ops: Vec<SurfaceOp>,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// A surface that already holds the draw plugin's anchor layer.
    pub fn with_sentinel(sentinel_id: &str) -> Self {
        let mut surface = Self::new();
        surface.sources.insert(
            DRAW_SOURCE_ID.to_string(),
            SourceSpec {
                id: DRAW_SOURCE_ID.to_string(),
                tiles: Vec::new(),
                tile_size: 512,
            },
        );
        surface.layers.push(StyleLayer {
            id: sentinel_id.to_string(),
            kind: LayerKind::Fill,
            source: Some(DRAW_SOURCE_ID.to_string()),
            paint: Map::new(),
        });
        surface
    }

    /// Layer ids bottom to top.
    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id)
    }

    pub fn paint_property(&self, layer_id: &str, property: &str) -> Option<&Value> {
        self.layers
            .iter()
            .find(|l| l.id == layer_id)
            .and_then(|l| l.paint.get(property))
    }

    /// Number of listeners bound to a layer across all event kinds.
    pub fn listener_count(&self, layer_id: &str) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.layer_id == layer_id)
            .count()
    }

    pub fn cursor(&self) -> &str {
        &self.canvas.cursor
    }

    pub fn ops(&self) -> &[SurfaceOp] {
        &self.ops
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Deliver an event to the listeners bound for its kind and layer.
    ///
    /// Returns how many listeners ran.
    pub fn fire(&mut self, event: &LayerEvent) -> usize {
        let handlers: Vec<LayerHandler> = self
            .listeners
            .iter()
            .filter(|l| l.kind == event.kind && l.layer_id == event.layer_id)
            .map(|l| l.handler.clone())
            .collect();

        for handler in &handlers {
            handler(event, &mut self.canvas);
        }
        handlers.len()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    fn insert_index(&self, before_id: Option<&str>) -> MapResult<usize> {
        match before_id {
            Some(before) => self.position(before).ok_or_else(|| {
                MapError::Surface(format!("anchor layer '{}' does not exist", before))
            }),
            None => Ok(self.layers.len()),
        }
    }
}

impl Surface for InMemorySurface {
    fn get_layer(&self, id: &str) -> Option<SurfaceLayer> {
        self.layers.iter().find(|l| l.id == id).map(|l| SurfaceLayer {
            id: l.id.clone(),
            kind: l.kind,
            source: l.source.clone(),
        })
    }

    fn add_layer(&mut self, spec: &SurfaceLayerSpec, before_id: Option<&str>) -> MapResult<()> {
        let id = spec.id.as_str();
        if self.position(id).is_some() {
            return Err(MapError::Surface(format!("layer '{}' already exists", id)));
        }
        let index = self.insert_index(before_id)?;

        match self.sources.get(&spec.source.id) {
            Some(existing) if existing != &spec.source => {
                return Err(MapError::Surface(format!(
                    "source '{}' already exists with different tiles",
                    spec.source.id
                )));
            }
            Some(_) => {}
            None => {
                self.sources.insert(spec.source.id.clone(), spec.source.clone());
            }
        }
        self.layers.insert(
            index,
            StyleLayer {
                id: id.to_string(),
                kind: spec.kind,
                source: Some(spec.source.id.clone()),
                paint: spec.paint.clone(),
            },
        );

        trace!(layer_id = id, index, "Layer added");
        self.ops.push(SurfaceOp::AddLayer {
            id: id.to_string(),
            before: before_id.map(str::to_string),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> MapResult<()> {
        let index = self
            .position(id)
            .ok_or_else(|| MapError::Surface(format!("layer '{}' does not exist", id)))?;
        self.layers.remove(index);
        self.ops.push(SurfaceOp::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn move_layer(&mut self, id: &str, before_id: Option<&str>) -> MapResult<()> {
        let from = self
            .position(id)
            .ok_or_else(|| MapError::Surface(format!("layer '{}' does not exist", id)))?;
        if before_id == Some(id) {
            return Ok(());
        }
        // Validate the anchor before detaching the layer.
        self.insert_index(before_id)?;

        let layer = self.layers.remove(from);
        let index = self.insert_index(before_id)?;
        self.layers.insert(index, layer);

        self.ops.push(SurfaceOp::MoveLayer {
            id: id.to_string(),
            before: before_id.map(str::to_string),
        });
        Ok(())
    }

    fn set_paint_property(&mut self, id: &str, property: &str, value: Value) -> MapResult<()> {
        let layer = self
            .layers
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| MapError::Surface(format!("layer '{}' does not exist", id)))?;
        layer.paint.insert(property.to_string(), value.clone());

        self.ops.push(SurfaceOp::SetPaint {
            id: id.to_string(),
            property: property.to_string(),
            value,
        });
        Ok(())
    }

    fn style_layers(&self) -> Vec<SurfaceLayer> {
        self.layers
            .iter()
            .map(|l| SurfaceLayer {
                id: l.id.clone(),
                kind: l.kind,
                source: l.source.clone(),
            })
            .collect()
    }

    fn remove_source(&mut self, source_id: &str) -> MapResult<()> {
        if let Some(user) = self
            .layers
            .iter()
            .find(|l| l.source.as_deref() == Some(source_id))
        {
            return Err(MapError::Surface(format!(
                "source '{}' is still used by layer '{}'",
                source_id, user.id
            )));
        }
        self.sources
            .remove(source_id)
            .ok_or_else(|| MapError::Surface(format!("source '{}' does not exist", source_id)))?;
        self.ops.push(SurfaceOp::RemoveSource(source_id.to_string()));
        Ok(())
    }

    fn on(&mut self, kind: LayerEventKind, layer_id: &str, handler: LayerHandler) -> ListenerId {
        self.next_listener += 1;
        let id = ListenerId(self.next_listener);
        self.listeners.push(Listener {
            id,
            kind,
            layer_id: layer_id.to_string(),
            handler,
        });
        self.ops.push(SurfaceOp::On {
            kind,
            layer_id: layer_id.to_string(),
        });
        id
    }

    fn off(&mut self, kind: LayerEventKind, layer_id: &str, listener: ListenerId) {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != listener);
        if self.listeners.len() != before {
            self.ops.push(SurfaceOp::Off {
                kind,
                layer_id: layer_id.to_string(),
            });
        }
    }

    fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }
}
