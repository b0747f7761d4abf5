//! Layer state and its synchronization onto an imperative map surface.
//!
//! The flow is one-directional:
//!
//! ```text
//! StoreCommand -> LayerStateStore -> derive() -> Reconciler -> LayerSync -> Surface
//! ```
//!
//! The store holds the ordered raster layer list and the filter inputs.
//! [`derivation::derive`] turns that into one [`RenderDirective`] per layer.
//! The [`Reconciler`] keeps one [`LayerSync`] per directive, and each unit
//! issues the add/remove/move/paint calls its layer needs.

pub mod config;
pub mod derivation;
pub mod reconciler;
pub mod session;
pub mod store;
pub mod surface;
pub mod sync;

pub use config::{SyncConfig, DEFAULT_SENTINEL_LAYER_ID};
pub use derivation::{
    derive, effective_filter, surface_source_id, FilterContext, RenderDirective,
};
pub use reconciler::{ReconcileReport, Reconciler};
pub use session::{MapSession, SessionUpdate};
pub use store::{CommandOutcome, LayerStateStore, StoreCommand, StoreEvent};
pub use surface::{
    Canvas, InMemorySurface, LayerEvent, LayerEventKind, LayerHandler, LayerKind, ListenerId,
    SourceSpec, Surface, SurfaceHandle, SurfaceLayer, SurfaceLayerSpec, SurfaceOp, SurfaceSlot,
};
pub use sync::{LayerSync, SyncChange, SyncState};
