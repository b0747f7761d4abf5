//! Per-layer synchronization against the surface.
//!
//! A [`LayerSync`] owns exactly one surface layer. It diffs each new
//! directive against the previous one and issues the smallest set of
//! surface calls that brings the layer in line.

use std::sync::Arc;

use map_common::{MapError, MapResult};
use metrics::counter;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::derivation::RenderDirective;
use crate::store::CommandOutcome;
use crate::surface::{
    Canvas, LayerEvent, LayerEventKind, LayerHandler, ListenerId, Surface, SurfaceHandle,
    SurfaceSlot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Waiting for the surface
    Uninitialized,
    Synced,
    /// Terminal
    Removed,
}

/// What an `initialize` or `update` call did to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncChange {
    Unchanged,
    /// Directive stored; applied once the surface is ready
    Deferred,
    /// Layer removed and re-added
    Resynced,
    Adjusted { reordered: bool, restyled: bool },
}

pub struct LayerSync {
    directive: RenderDirective,
    sentinel_layer_id: String,
    state: SyncState,
    surface: Option<SurfaceHandle>,
    listeners: Vec<(LayerEventKind, ListenerId)>,
    click_sink: Option<mpsc::UnboundedSender<LayerEvent>>,
}

impl LayerSync {
    pub fn new(directive: RenderDirective, sentinel_layer_id: impl Into<String>) -> Self {
        Self {
            directive,
            sentinel_layer_id: sentinel_layer_id.into(),
            state: SyncState::Uninitialized,
            surface: None,
            listeners: Vec::new(),
            click_sink: None,
        }
    }

    /// Forward click events on this layer to `sink`.
    pub fn with_click_sink(mut self, sink: mpsc::UnboundedSender<LayerEvent>) -> Self {
        self.click_sink = Some(sink);
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn directive(&self) -> &RenderDirective {
        &self.directive
    }

    /// Wait for the surface, then put the layer on it. Runs once.
    pub async fn initialize(&mut self, slot: &SurfaceSlot) -> MapResult<SyncChange> {
        match self.state {
            SyncState::Removed => return Err(self.removed()),
            SyncState::Synced => return Ok(SyncChange::Unchanged),
            SyncState::Uninitialized => {}
        }

        let handle = slot.ready().await?;
        {
            let mut surface = handle.lock().await;
            self.sync(&mut *surface)?;
        }
        self.surface = Some(handle);
        self.state = SyncState::Synced;
        debug!(layer_id = %self.directive.layer_id, "Layer initialized");
        Ok(SyncChange::Resynced)
    }

    /// Apply a new directive for the same layer.
    pub async fn update(&mut self, directive: RenderDirective) -> MapResult<SyncChange> {
        match self.state {
            SyncState::Removed => return Err(self.removed()),
            SyncState::Uninitialized => {
                self.directive = directive;
                return Ok(SyncChange::Deferred);
            }
            SyncState::Synced => {}
        }
        if directive == self.directive {
            return Ok(SyncChange::Unchanged);
        }

        let previous = std::mem::replace(&mut self.directive, directive);
        let handle = self.handle()?;
        let mut surface = handle.lock().await;

        if previous.spec != self.directive.spec || previous.clickable != self.directive.clickable {
            self.sync(&mut *surface)?;
            counter!("layer_sync_operations_total", "operation" => "resync").increment(1);
            return Ok(SyncChange::Resynced);
        }

        let reordered = previous.before_layer_id != self.directive.before_layer_id;
        if reordered {
            self.move_on_surface(&mut *surface)?;
            counter!("layer_sync_operations_total", "operation" => "reorder").increment(1);
        }
        let restyled = previous.opacity != self.directive.opacity;
        if restyled {
            self.apply_opacity(&mut *surface)?;
            counter!("layer_sync_operations_total", "operation" => "restyle").increment(1);
        }
        Ok(SyncChange::Adjusted {
            reordered,
            restyled,
        })
    }

    /// Move the layer to its anchor again without touching anything else.
    pub async fn reorder(&mut self) -> MapResult<()> {
        match self.state {
            SyncState::Removed => Err(self.removed()),
            SyncState::Uninitialized => Ok(()),
            SyncState::Synced => {
                let handle = self.handle()?;
                let mut surface = handle.lock().await;
                self.move_on_surface(&mut *surface)
            }
        }
    }

    /// Take the layer off the surface for good. Idempotent.
    pub async fn destroy(&mut self) -> MapResult<CommandOutcome> {
        if self.state == SyncState::Removed {
            return Ok(CommandOutcome::Unchanged);
        }

        let outcome = match self.surface.take() {
            Some(handle) => {
                let mut surface = handle.lock().await;
                self.remove_from_surface(&mut *surface)?
            }
            None => CommandOutcome::TargetNotFound,
        };
        self.state = SyncState::Removed;
        counter!("layer_sync_operations_total", "operation" => "remove").increment(1);
        debug!(layer_id = %self.directive.layer_id, ?outcome, "Layer destroyed");
        Ok(outcome)
    }

    fn removed(&self) -> MapError {
        MapError::SyncRemoved(self.directive.layer_id.to_string())
    }

    fn handle(&self) -> MapResult<SurfaceHandle> {
        self.surface.clone().ok_or(MapError::SurfaceDetached)
    }

    fn sync(&mut self, surface: &mut dyn Surface) -> MapResult<()> {
        self.remove_from_surface(surface)?;
        self.add_to_surface(surface)
    }

    /// Anchor to insert or move below: the before target, else the sentinel,
    /// else `None` for the top of the stack.
    fn anchor(&self, surface: &dyn Surface) -> Option<String> {
        self.directive
            .before_layer_id
            .as_ref()
            .map(|id| id.as_str())
            .filter(|id| surface.get_layer(id).is_some())
            .or_else(|| {
                Some(self.sentinel_layer_id.as_str())
                    .filter(|id| surface.get_layer(id).is_some())
            })
            .map(str::to_string)
    }

    fn add_to_surface(&mut self, surface: &mut dyn Surface) -> MapResult<()> {
        let anchor = self.anchor(surface);
        surface.add_layer(&self.directive.spec, anchor.as_deref())?;
        trace!(layer_id = %self.directive.layer_id, anchor = ?anchor, "Layer added to surface");

        if self.directive.clickable {
            self.bind_handlers(surface);
        }
        self.apply_opacity(surface)
    }

    fn remove_from_surface(&mut self, surface: &mut dyn Surface) -> MapResult<CommandOutcome> {
        let id = self.directive.layer_id.as_str();

        // Listeners go even when the layer is already gone, so a later add
        // never doubles them.
        for (kind, listener) in self.listeners.drain(..) {
            surface.off(kind, id, listener);
        }

        let Some(layer) = surface.get_layer(id) else {
            return Ok(CommandOutcome::TargetNotFound);
        };
        surface.remove_layer(id)?;

        if let Some(source) = layer.source {
            let in_use = surface
                .style_layers()
                .iter()
                .any(|l| l.source.as_deref() == Some(source.as_str()));
            if in_use {
                trace!(layer_id = id, source = %source, "Source still referenced, keeping it");
            } else {
                surface.remove_source(&source)?;
            }
        }
        Ok(CommandOutcome::Applied)
    }

    fn move_on_surface(&self, surface: &mut dyn Surface) -> MapResult<()> {
        let anchor = self.anchor(surface);
        surface.move_layer(self.directive.layer_id.as_str(), anchor.as_deref())
    }

    fn apply_opacity(&self, surface: &mut dyn Surface) -> MapResult<()> {
        let property = self.directive.spec.kind.opacity_property();
        surface.set_paint_property(
            self.directive.layer_id.as_str(),
            &property,
            json!(self.directive.opacity),
        )
    }

    fn bind_handlers(&mut self, surface: &mut dyn Surface) {
        let id = self.directive.layer_id.as_str();

        let sink = self.click_sink.clone();
        let click: LayerHandler = Arc::new(move |event: &LayerEvent, _canvas: &mut Canvas| {
            if let Some(sink) = &sink {
                if sink.send(event.clone()).is_err() {
                    debug!(layer_id = %event.layer_id, "Click receiver dropped");
                }
            }
        });
        let enter: LayerHandler = Arc::new(|_event: &LayerEvent, canvas: &mut Canvas| {
            canvas.cursor = "pointer".to_string();
        });
        let leave: LayerHandler = Arc::new(|_event: &LayerEvent, canvas: &mut Canvas| {
            canvas.cursor.clear();
        });

        for (kind, handler) in [
            (LayerEventKind::Click, click),
            (LayerEventKind::MouseEnter, enter),
            (LayerEventKind::MouseLeave, leave),
        ] {
            let listener = surface.on(kind, id, handler);
            self.listeners.push((kind, listener));
        }
    }
}
