//! The single source of truth for layer state.
//!
//! Public commands are turned into [`StoreCommand`]s and applied by
//! [`LayerStateStore::dispatch`]. Each applied command appends a
//! [`StoreEvent`] and bumps the revision published to subscribers.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use map_common::{DrawMode, DrawnFeature, LayerId, MapError, MapResult, RasterLayer};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::derivation::{derive, validate_layer, FilterContext, RenderDirective};

/// A state change request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StoreCommand {
    SetMapLoaded,
    SetRasterLayers { layers: Vec<RasterLayer> },
    AddRasterLayers { layers: Vec<RasterLayer> },
    RemoveRasterLayers { ids: Vec<LayerId> },
    MoveRasterLayer { from: usize, to: usize },
    UpdateRasterLayerOpacity { id: LayerId, opacity: f64 },
    SetDrawMode { mode: DrawMode },
    AddDrawnFeature { feature: DrawnFeature },
    RemoveDrawnFeature { area_id: String },
    SetDrawnFeatures { features: Vec<DrawnFeature> },
    ClearDrawnFeatures,
    SetFiltersLayerId { id: LayerId },
    ClearFiltersLayerId,
    SetSelectedLayerForSelection { layer: Option<RasterLayer> },
    SetSelectedTimestamp { timestamp: Option<DateTime<Utc>> },
    SetCqlFilter { filter: Option<String> },
}

impl StoreCommand {
    /// Whether applying this command can change the render directives.
    pub fn affects_directives(&self) -> bool {
        matches!(
            self,
            StoreCommand::SetMapLoaded
                | StoreCommand::SetRasterLayers { .. }
                | StoreCommand::AddRasterLayers { .. }
                | StoreCommand::RemoveRasterLayers { .. }
                | StoreCommand::MoveRasterLayer { .. }
                | StoreCommand::UpdateRasterLayerOpacity { .. }
                | StoreCommand::SetFiltersLayerId { .. }
                | StoreCommand::ClearFiltersLayerId
                | StoreCommand::SetSelectedTimestamp { .. }
                | StoreCommand::SetCqlFilter { .. }
        )
    }
}

/// What a command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    /// State already matched; nothing was recorded
    Unchanged,
    /// The command named something that does not exist
    TargetNotFound,
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    MapLoaded,
    LayersReplaced { ids: Vec<LayerId> },
    LayersAdded { ids: Vec<LayerId> },
    LayersRemoved { ids: Vec<LayerId> },
    LayerMoved { id: LayerId, from: usize, to: usize },
    OpacityChanged { id: LayerId, opacity: f64 },
    DrawModeChanged { mode: Option<DrawMode> },
    DrawnFeaturesChanged { count: usize },
    FiltersLayerChanged { id: Option<LayerId> },
    SelectionLayerChanged { id: Option<LayerId> },
    TimestampChanged { timestamp: Option<DateTime<Utc>> },
    CqlFilterChanged { filter: Option<String> },
}

#[derive(Debug, Default)]
struct MapState {
    map_loaded: bool,
    raster_layers: Vec<RasterLayer>,
    draw_mode: Option<DrawMode>,
    drawn_features: Vec<DrawnFeature>,
    filter: FilterContext,
    selected_layer_for_selection: Option<RasterLayer>,
}

pub struct LayerStateStore {
    state: MapState,
    events: Vec<StoreEvent>,
    revision: u64,
    revision_tx: watch::Sender<u64>,
}

impl Default for LayerStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStateStore {
    pub fn new() -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            state: MapState::default(),
            events: Vec::new(),
            revision: 0,
            revision_tx,
        }
    }

    /// Apply one command.
    pub fn dispatch(&mut self, command: StoreCommand) -> MapResult<CommandOutcome> {
        let event = match command {
            StoreCommand::SetMapLoaded => self.apply_map_loaded(),
            StoreCommand::SetRasterLayers { layers } => self.apply_set_layers(layers)?,
            StoreCommand::AddRasterLayers { layers } => self.apply_add_layers(layers)?,
            StoreCommand::RemoveRasterLayers { ids } => self.apply_remove_layers(&ids),
            StoreCommand::MoveRasterLayer { from, to } => self.apply_move_layer(from, to)?,
            StoreCommand::UpdateRasterLayerOpacity { id, opacity } => {
                return self.apply_opacity(id, opacity);
            }
            StoreCommand::SetDrawMode { mode } => self.apply_draw_mode(mode),
            StoreCommand::AddDrawnFeature { feature } => self.apply_add_feature(feature),
            StoreCommand::RemoveDrawnFeature { area_id } => {
                return self.apply_remove_feature(&area_id);
            }
            StoreCommand::SetDrawnFeatures { features } => self.apply_set_features(features),
            StoreCommand::ClearDrawnFeatures => self.apply_set_features(Vec::new()),
            StoreCommand::SetFiltersLayerId { id } => self.apply_filters_layer(Some(id)),
            StoreCommand::ClearFiltersLayerId => self.apply_filters_layer(None),
            StoreCommand::SetSelectedLayerForSelection { layer } => {
                self.apply_selection_layer(layer)
            }
            StoreCommand::SetSelectedTimestamp { timestamp } => self.apply_timestamp(timestamp),
            StoreCommand::SetCqlFilter { filter } => self.apply_cql_filter(filter),
        };

        Ok(match event {
            Some(event) => {
                self.record(event);
                CommandOutcome::Applied
            }
            None => CommandOutcome::Unchanged,
        })
    }

    fn record(&mut self, event: StoreEvent) {
        self.revision += 1;
        debug!(revision = self.revision, event = ?event, "Store updated");
        self.events.push(event);
        self.revision_tx.send_replace(self.revision);
    }

    fn apply_map_loaded(&mut self) -> Option<StoreEvent> {
        if self.state.map_loaded {
            return None;
        }
        self.state.map_loaded = true;
        Some(StoreEvent::MapLoaded)
    }

    fn apply_set_layers(&mut self, layers: Vec<RasterLayer>) -> MapResult<Option<StoreEvent>> {
        let mut seen = HashSet::new();
        for layer in &layers {
            if !seen.insert(&layer.id) {
                return Err(MapError::DuplicateLayer(layer.id.to_string()));
            }
            validate_layer(layer)?;
        }
        if layers == self.state.raster_layers {
            return Ok(None);
        }

        let ids = layers.iter().map(|l| l.id.clone()).collect();
        self.state.raster_layers = layers;
        Ok(Some(StoreEvent::LayersReplaced { ids }))
    }

    fn apply_add_layers(&mut self, layers: Vec<RasterLayer>) -> MapResult<Option<StoreEvent>> {
        for layer in &layers {
            validate_layer(layer)?;
        }

        let mut taken: HashSet<LayerId> = self.raster_layer_ids().into_iter().collect();
        let mut additions = Vec::new();
        for layer in layers {
            if self.state.raster_layers.contains(&layer) {
                continue;
            }
            if !taken.insert(layer.id.clone()) {
                warn!(layer_id = %layer.id, "Layer id already present, not adding");
                continue;
            }
            additions.push(layer);
        }
        if additions.is_empty() {
            return Ok(None);
        }

        let ids = additions.iter().map(|l| l.id.clone()).collect();
        additions.append(&mut self.state.raster_layers);
        self.state.raster_layers = additions;
        Ok(Some(StoreEvent::LayersAdded { ids }))
    }

    fn apply_remove_layers(&mut self, ids: &[LayerId]) -> Option<StoreEvent> {
        let mut removed = Vec::new();
        self.state.raster_layers.retain(|layer| {
            let keep = !ids.contains(&layer.id);
            if !keep {
                removed.push(layer.id.clone());
            }
            keep
        });
        if removed.is_empty() {
            return None;
        }
        Some(StoreEvent::LayersRemoved { ids: removed })
    }

    fn apply_move_layer(&mut self, from: usize, to: usize) -> MapResult<Option<StoreEvent>> {
        let len = self.state.raster_layers.len();
        for index in [from, to] {
            if index >= len {
                return Err(MapError::IndexOutOfBounds { index, len });
            }
        }
        if from == to {
            return Ok(None);
        }

        let layer = self.state.raster_layers.remove(from);
        let id = layer.id.clone();
        self.state.raster_layers.insert(to, layer);
        Ok(Some(StoreEvent::LayerMoved { id, from, to }))
    }

    fn apply_opacity(&mut self, id: LayerId, opacity: f64) -> MapResult<CommandOutcome> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MapError::InvalidOpacity(opacity));
        }
        let Some(layer) = self.state.raster_layers.iter_mut().find(|l| l.id == id) else {
            debug!(layer_id = %id, "Opacity update for unknown layer");
            return Ok(CommandOutcome::TargetNotFound);
        };
        if layer.opacity == Some(opacity) {
            return Ok(CommandOutcome::Unchanged);
        }

        layer.opacity = Some(opacity);
        self.record(StoreEvent::OpacityChanged { id, opacity });
        Ok(CommandOutcome::Applied)
    }

    fn apply_draw_mode(&mut self, mode: DrawMode) -> Option<StoreEvent> {
        let next = if self.state.draw_mode == Some(mode) {
            None
        } else {
            Some(mode)
        };
        self.state.draw_mode = next;
        Some(StoreEvent::DrawModeChanged { mode: next })
    }

    fn apply_add_feature(&mut self, feature: DrawnFeature) -> Option<StoreEvent> {
        if self
            .state
            .drawn_features
            .iter()
            .any(|f| f.area_id() == feature.area_id())
        {
            return None;
        }
        self.state.drawn_features.push(feature);
        Some(StoreEvent::DrawnFeaturesChanged {
            count: self.state.drawn_features.len(),
        })
    }

    fn apply_remove_feature(&mut self, area_id: &str) -> MapResult<CommandOutcome> {
        let before = self.state.drawn_features.len();
        self.state.drawn_features.retain(|f| f.area_id() != area_id);
        if self.state.drawn_features.len() == before {
            return Ok(CommandOutcome::TargetNotFound);
        }
        self.record(StoreEvent::DrawnFeaturesChanged {
            count: self.state.drawn_features.len(),
        });
        Ok(CommandOutcome::Applied)
    }

    fn apply_set_features(&mut self, features: Vec<DrawnFeature>) -> Option<StoreEvent> {
        let mut seen = HashSet::new();
        let features: Vec<DrawnFeature> = features
            .into_iter()
            .filter(|f| seen.insert(f.area_id().to_string()))
            .collect();
        if features == self.state.drawn_features {
            return None;
        }
        self.state.drawn_features = features;
        Some(StoreEvent::DrawnFeaturesChanged {
            count: self.state.drawn_features.len(),
        })
    }

    fn apply_filters_layer(&mut self, id: Option<LayerId>) -> Option<StoreEvent> {
        if self.state.filter.filters_layer_id == id {
            return None;
        }
        self.state.filter.filters_layer_id = id.clone();
        Some(StoreEvent::FiltersLayerChanged { id })
    }

    fn apply_selection_layer(&mut self, layer: Option<RasterLayer>) -> Option<StoreEvent> {
        if self.state.selected_layer_for_selection == layer {
            return None;
        }
        let id = layer.as_ref().map(|l| l.id.clone());
        self.state.selected_layer_for_selection = layer;
        Some(StoreEvent::SelectionLayerChanged { id })
    }

    fn apply_timestamp(&mut self, timestamp: Option<DateTime<Utc>>) -> Option<StoreEvent> {
        if self.state.filter.selected_timestamp == timestamp {
            return None;
        }
        self.state.filter.selected_timestamp = timestamp;
        Some(StoreEvent::TimestampChanged { timestamp })
    }

    fn apply_cql_filter(&mut self, filter: Option<String>) -> Option<StoreEvent> {
        if self.state.filter.cql_filter == filter {
            return None;
        }
        self.state.filter.cql_filter = filter.clone();
        Some(StoreEvent::CqlFilterChanged { filter })
    }

    // === Commands ===

    pub fn set_map_loaded(&mut self) -> CommandOutcome {
        self.dispatch(StoreCommand::SetMapLoaded)
            .unwrap_or(CommandOutcome::Unchanged)
    }

    pub fn set_raster_layers(&mut self, layers: Vec<RasterLayer>) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::SetRasterLayers { layers })
    }

    pub fn add_raster_layers(&mut self, layers: Vec<RasterLayer>) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::AddRasterLayers { layers })
    }

    /// Remove every layer whose id matches one of `layers`.
    pub fn remove_raster_layers(&mut self, layers: &[RasterLayer]) -> MapResult<CommandOutcome> {
        let ids = layers.iter().map(|l| l.id.clone()).collect();
        self.dispatch(StoreCommand::RemoveRasterLayers { ids })
    }

    pub fn move_raster_layer(&mut self, from: usize, to: usize) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::MoveRasterLayer { from, to })
    }

    pub fn update_raster_layer_opacity(
        &mut self,
        id: impl Into<LayerId>,
        opacity: f64,
    ) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::UpdateRasterLayerOpacity {
            id: id.into(),
            opacity,
        })
    }

    /// Set the draw mode; setting the current mode again clears it.
    pub fn set_draw_mode(&mut self, mode: DrawMode) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::SetDrawMode { mode })
    }

    pub fn add_drawn_feature(&mut self, feature: DrawnFeature) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::AddDrawnFeature { feature })
    }

    pub fn remove_drawn_feature(&mut self, feature: &DrawnFeature) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::RemoveDrawnFeature {
            area_id: feature.area_id().to_string(),
        })
    }

    pub fn set_drawn_features(&mut self, features: Vec<DrawnFeature>) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::SetDrawnFeatures { features })
    }

    pub fn clear_drawn_features(&mut self) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::ClearDrawnFeatures)
    }

    pub fn set_filters_layer_id(&mut self, id: impl Into<LayerId>) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::SetFiltersLayerId { id: id.into() })
    }

    pub fn clear_filters_layer_id(&mut self) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::ClearFiltersLayerId)
    }

    pub fn set_selected_layer_for_selection(
        &mut self,
        layer: Option<RasterLayer>,
    ) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::SetSelectedLayerForSelection { layer })
    }

    pub fn set_selected_timestamp(
        &mut self,
        timestamp: Option<DateTime<Utc>>,
    ) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::SetSelectedTimestamp { timestamp })
    }

    pub fn set_cql_filter(&mut self, filter: Option<String>) -> MapResult<CommandOutcome> {
        self.dispatch(StoreCommand::SetCqlFilter { filter })
    }

    // === Getters ===

    pub fn map_loaded(&self) -> bool {
        self.state.map_loaded
    }

    /// Layers on the map; empty until the map has loaded.
    pub fn raster_layers(&self) -> &[RasterLayer] {
        if self.state.map_loaded {
            &self.state.raster_layers
        } else {
            &[]
        }
    }

    pub fn raster_layer_ids(&self) -> Vec<LayerId> {
        self.state.raster_layers.iter().map(|l| l.id.clone()).collect()
    }

    /// Ids of loaded layers that follow the selected timestamp.
    pub fn time_filtered_layer_ids(&self) -> Vec<LayerId> {
        self.raster_layers()
            .iter()
            .filter(|l| l.time_filter)
            .map(|l| l.id.clone())
            .collect()
    }

    pub fn draw_mode(&self) -> Option<DrawMode> {
        self.state.draw_mode
    }

    pub fn drawn_features(&self) -> &[DrawnFeature] {
        &self.state.drawn_features
    }

    pub fn filters_layer_id(&self) -> Option<&LayerId> {
        self.state.filter.filters_layer_id.as_ref()
    }

    pub fn selected_layer_for_selection(&self) -> Option<&RasterLayer> {
        self.state.selected_layer_for_selection.as_ref()
    }

    pub fn filter_context(&self) -> &FilterContext {
        &self.state.filter
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn events(&self) -> &[StoreEvent] {
        &self.events
    }

    /// Receiver that observes the latest revision; bursts coalesce.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }

    /// Render directives for the visible layers and current filters.
    pub fn visible_layer_directives(&self, config: &SyncConfig) -> Vec<RenderDirective> {
        derive(self.raster_layers(), &self.state.filter, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{drawn_feature, raster_layer, raster_layers};

    fn ids(store: &LayerStateStore) -> Vec<String> {
        store.raster_layer_ids().iter().map(|id| id.to_string()).collect()
    }

    fn loaded_store(layer_ids: &[&str]) -> LayerStateStore {
        let mut store = LayerStateStore::new();
        store.set_map_loaded();
        store.set_raster_layers(raster_layers(layer_ids)).unwrap();
        store
    }

    #[test]
    fn test_layers_hidden_until_map_loaded() {
        let mut store = LayerStateStore::new();
        store.set_raster_layers(raster_layers(&["a"])).unwrap();
        assert!(store.raster_layers().is_empty());
        assert_eq!(ids(&store), vec!["a"]);

        assert_eq!(store.set_map_loaded(), CommandOutcome::Applied);
        assert_eq!(store.raster_layers().len(), 1);
        assert_eq!(store.set_map_loaded(), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_set_layers_rejects_duplicate_ids() {
        let mut store = LayerStateStore::new();
        let err = store
            .set_raster_layers(vec![raster_layer("a"), raster_layer("a").with_opacity(0.5)])
            .unwrap_err();
        assert!(matches!(err, MapError::DuplicateLayer(_)));
        assert!(store.raster_layer_ids().is_empty());
    }

    #[test]
    fn test_add_puts_new_layers_in_front_in_order() {
        let mut store = loaded_store(&["a"]);
        store
            .add_raster_layers(raster_layers(&["x", "y"]))
            .unwrap();
        assert_eq!(ids(&store), vec!["x", "y", "a"]);
    }

    #[test]
    fn test_add_skips_existing_values() {
        let mut store = loaded_store(&["a", "b"]);
        let outcome = store.add_raster_layers(raster_layers(&["a", "b"])).unwrap();
        assert_eq!(outcome, CommandOutcome::Unchanged);
        assert_eq!(ids(&store), vec!["a", "b"]);
    }

    #[test]
    fn test_add_never_duplicates_ids() {
        let mut store = loaded_store(&["a"]);
        store
            .add_raster_layers(vec![
                raster_layer("a").with_opacity(0.3),
                raster_layer("c"),
                raster_layer("c").with_opacity(0.1),
            ])
            .unwrap();
        assert_eq!(ids(&store), vec!["c", "a"]);
        assert_eq!(store.raster_layers()[0].opacity, None);
    }

    #[test]
    fn test_remove_keeps_relative_order() {
        let mut store = loaded_store(&["a", "b", "c", "d"]);
        store
            .remove_raster_layers(&raster_layers(&["b", "d", "zz"]))
            .unwrap();
        assert_eq!(ids(&store), vec!["a", "c"]);
        assert_eq!(
            store.remove_raster_layers(&raster_layers(&["zz"])).unwrap(),
            CommandOutcome::Unchanged
        );
    }

    #[test]
    fn test_move_layer() {
        let mut store = loaded_store(&["a", "b", "c"]);
        store.move_raster_layer(0, 2).unwrap();
        assert_eq!(ids(&store), vec!["b", "c", "a"]);
        store.move_raster_layer(2, 0).unwrap();
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
        assert_eq!(store.move_raster_layer(1, 1).unwrap(), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_move_out_of_bounds_is_an_error() {
        let mut store = loaded_store(&["a", "b"]);
        let revision = store.revision();

        let err = store.move_raster_layer(0, 5).unwrap_err();
        assert!(matches!(err, MapError::IndexOutOfBounds { index: 5, len: 2 }));
        assert!(store.move_raster_layer(7, 0).is_err());
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_opacity_update_in_place() {
        let mut store = loaded_store(&["a", "b"]);
        assert_eq!(
            store.update_raster_layer_opacity("b", 0.25).unwrap(),
            CommandOutcome::Applied
        );
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.raster_layers()[1].opacity, Some(0.25));
        assert_eq!(
            store.update_raster_layer_opacity("b", 0.25).unwrap(),
            CommandOutcome::Unchanged
        );
    }

    #[test]
    fn test_opacity_unknown_layer_and_range() {
        let mut store = loaded_store(&["a"]);
        assert_eq!(
            store.update_raster_layer_opacity("nope", 0.5).unwrap(),
            CommandOutcome::TargetNotFound
        );
        assert!(matches!(
            store.update_raster_layer_opacity("a", 1.5),
            Err(MapError::InvalidOpacity(_))
        ));
    }

    #[test]
    fn test_draw_mode_toggles() {
        let mut store = LayerStateStore::new();
        store.set_draw_mode(DrawMode::Polygon).unwrap();
        assert_eq!(store.draw_mode(), Some(DrawMode::Polygon));
        store.set_draw_mode(DrawMode::Polygon).unwrap();
        assert_eq!(store.draw_mode(), None);

        store.set_draw_mode(DrawMode::Polygon).unwrap();
        store.set_draw_mode(DrawMode::Rectangle).unwrap();
        assert_eq!(store.draw_mode(), Some(DrawMode::Rectangle));
    }

    #[test]
    fn test_drawn_features_dedup_by_area_id() {
        let mut store = LayerStateStore::new();
        store.add_drawn_feature(drawn_feature("g1")).unwrap();
        let outcome = store.add_drawn_feature(drawn_feature("g1")).unwrap();
        assert_eq!(outcome, CommandOutcome::Unchanged);
        assert_eq!(store.drawn_features().len(), 1);

        store.add_drawn_feature(drawn_feature("g2")).unwrap();
        store.remove_drawn_feature(&drawn_feature("g1")).unwrap();
        assert_eq!(store.drawn_features()[0].area_id(), "g2");
        assert_eq!(
            store.remove_drawn_feature(&drawn_feature("g1")).unwrap(),
            CommandOutcome::TargetNotFound
        );
    }

    #[test]
    fn test_set_and_clear_drawn_features() {
        let mut store = LayerStateStore::new();
        store
            .set_drawn_features(vec![drawn_feature("g1"), drawn_feature("g1"), drawn_feature("g2")])
            .unwrap();
        assert_eq!(store.drawn_features().len(), 2);

        store.clear_drawn_features().unwrap();
        assert!(store.drawn_features().is_empty());
        assert_eq!(store.clear_drawn_features().unwrap(), CommandOutcome::Unchanged);
    }

    #[test]
    fn test_filters_layer_id() {
        let mut store = LayerStateStore::new();
        store.set_filters_layer_id("a").unwrap();
        assert_eq!(store.filters_layer_id(), Some(&LayerId::new("a")));
        assert_eq!(store.set_filters_layer_id("a").unwrap(), CommandOutcome::Unchanged);
        store.clear_filters_layer_id().unwrap();
        assert_eq!(store.filters_layer_id(), None);
    }

    #[test]
    fn test_time_filtered_ids() {
        let mut store = LayerStateStore::new();
        store
            .set_raster_layers(vec![raster_layer("a"), test_utils::time_layer("t")])
            .unwrap();
        assert!(store.time_filtered_layer_ids().is_empty());
        store.set_map_loaded();
        assert_eq!(store.time_filtered_layer_ids(), vec![LayerId::new("t")]);
    }

    #[test]
    fn test_selection_layer() {
        let mut store = LayerStateStore::new();
        store
            .set_selected_layer_for_selection(Some(raster_layer("a")))
            .unwrap();
        assert_eq!(store.selected_layer_for_selection().unwrap().id, LayerId::new("a"));
        store.set_selected_layer_for_selection(None).unwrap();
        assert!(store.selected_layer_for_selection().is_none());
    }

    #[test]
    fn test_event_log_and_revision() {
        let mut store = loaded_store(&["a", "b"]);
        let rx = store.subscribe();
        store.move_raster_layer(0, 1).unwrap();
        store.update_raster_layer_opacity("nope", 0.5).unwrap();

        assert_eq!(store.revision(), 3);
        assert_eq!(*rx.borrow(), 3);
        assert_eq!(
            store.events().last(),
            Some(&StoreEvent::LayerMoved {
                id: LayerId::new("a"),
                from: 0,
                to: 1
            })
        );
    }

    #[test]
    fn test_commands_from_yaml() {
        let commands: Vec<StoreCommand> = serde_yaml::from_str(
            "- command: move_raster_layer\n  from: 0\n  to: 1\n- command: set_draw_mode\n  mode: polygon\n- command: clear_filters_layer_id\n",
        )
        .unwrap();
        assert_eq!(commands[0], StoreCommand::MoveRasterLayer { from: 0, to: 1 });
        assert!(commands[0].affects_directives());
        assert!(!commands[1].affects_directives());
        assert_eq!(commands[2], StoreCommand::ClearFiltersLayerId);
    }

    #[test]
    fn test_directives_follow_store_order() {
        let mut store = loaded_store(&["a", "b"]);
        store.move_raster_layer(0, 1).unwrap();
        let directives = store.visible_layer_directives(&SyncConfig::default());
        let order: Vec<&str> = directives.iter().map(|d| d.layer_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(directives[0].before_layer_id, Some(LayerId::new("a")));
    }

    #[test]
    fn test_no_directives_before_map_loaded() {
        let mut store = LayerStateStore::new();
        store.set_raster_layers(raster_layers(&["a"])).unwrap();
        assert!(store.visible_layer_directives(&SyncConfig::default()).is_empty());
    }
}
