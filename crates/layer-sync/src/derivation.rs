//! Pure derivation of render directives from layer state.
//!
//! `derive` is recomputed from scratch whenever one of its inputs changes;
//! directives are never patched in place.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use map_common::{LayerId, MapError, MapResult, RasterLayer, TimeWindow};
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::warn;
use wms_protocol::{combine_cql, GetMapTemplate};

use crate::config::SyncConfig;
use crate::surface::{LayerKind, SourceSpec, SurfaceLayerSpec};

/// Cross-cutting filter inputs applied to every layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterContext {
    /// Layer currently targeted by the interactive filter
    pub filters_layer_id: Option<LayerId>,
    /// Time slider position for time-filtered layers
    pub selected_timestamp: Option<DateTime<Utc>>,
    /// Filter expression for the targeted layer
    pub cql_filter: Option<String>,
}

/// How one layer should currently appear on the surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDirective {
    pub layer_id: LayerId,
    pub spec: SurfaceLayerSpec,
    /// Layer painted directly above this one; `None` for the topmost
    pub before_layer_id: Option<LayerId>,
    pub opacity: f64,
    pub clickable: bool,
}

/// Filter expression a layer's tiles are requested with.
///
/// Fails only when the time window cannot be placed at the selected time.
pub fn effective_filter(
    layer: &RasterLayer,
    ctx: &FilterContext,
    window: &TimeWindow,
) -> MapResult<Option<String>> {
    let mut parts = Vec::new();

    if ctx.filters_layer_id.as_ref() == Some(&layer.id) {
        if let Some(cql) = &ctx.cql_filter {
            parts.push(cql.clone());
        }
    }

    if layer.time_filter {
        if let Some(selected) = ctx.selected_timestamp {
            parts.push(window.predicate(selected)?);
        }
    }

    Ok(combine_cql(parts))
}

/// Surface source id for a layer drawing from `tiles`.
///
/// A named shared source is only reused by layers requesting identical
/// tiles. The tile fingerprint in the id keeps layers whose requests
/// diverge, for example through a filter, on separate sources.
pub fn surface_source_id(layer: &RasterLayer, tiles: &[String], tile_size: u32) -> String {
    match &layer.source.source_id {
        Some(shared) => {
            let mut hasher = DefaultHasher::new();
            tiles.hash(&mut hasher);
            tile_size.hash(&mut hasher);
            format!("{}-{:016x}", shared, hasher.finish())
        }
        None => layer.id.to_string(),
    }
}

/// Surface-native raster spec for a layer with the given filter.
pub fn surface_spec(layer: &RasterLayer, filter: Option<String>) -> MapResult<SurfaceLayerSpec> {
    let tiles = vec![GetMapTemplate::for_source(&layer.source, layer.style.as_deref())
        .with_cql_filter(filter)
        .to_tile_url(&layer.source.url)?];
    let tile_size = layer.source.tile_size;

    Ok(SurfaceLayerSpec {
        id: layer.id.clone(),
        kind: LayerKind::Raster,
        source: SourceSpec {
            id: surface_source_id(layer, &tiles, tile_size),
            tiles,
            tile_size,
        },
        paint: Map::new(),
    })
}

/// Reject layers that could never be rendered.
pub fn validate_layer(layer: &RasterLayer) -> MapResult<()> {
    if let Some(opacity) = layer.opacity {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(MapError::InvalidOpacity(opacity));
        }
    }
    surface_spec(layer, None).map(|_| ())
}

/// One directive per layer, in paint order (later entries on top).
pub fn derive(
    layers: &[RasterLayer],
    ctx: &FilterContext,
    config: &SyncConfig,
) -> Vec<RenderDirective> {
    let mut directives: Vec<RenderDirective> = layers
        .iter()
        .filter_map(|layer| {
            let spec = effective_filter(layer, ctx, &config.time_window)
                .and_then(|filter| surface_spec(layer, filter));
            match spec {
                Ok(spec) => Some(RenderDirective {
                    layer_id: layer.id.clone(),
                    spec,
                    before_layer_id: None,
                    opacity: layer.opacity.unwrap_or(config.default_opacity),
                    clickable: ctx.filters_layer_id.as_ref() == Some(&layer.id)
                        || config.is_clickable(&layer.id),
                }),
                Err(err) => {
                    warn!(layer_id = %layer.id, error = %err, "Skipping layer that cannot be rendered");
                    None
                }
            }
        })
        .collect();

    let above: Vec<Option<LayerId>> = directives
        .iter()
        .skip(1)
        .map(|d| Some(d.layer_id.clone()))
        .chain(std::iter::once(None))
        .collect();
    for (directive, before) in directives.iter_mut().zip(above) {
        directive.before_layer_id = before;
    }

    directives
}
