//! Session scripts: a YAML list of store commands replayed against an
//! in-memory surface.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use layer_sync::{
    CommandOutcome, InMemorySurface, LayerEvent, MapSession, ReconcileReport, RenderDirective,
    StoreCommand,
};
use map_common::LayerId;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::SessionConfig;

/// One script entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptStep {
    /// Add catalog layers by id
    AddFromCatalog { add_from_catalog: Vec<LayerId> },
    /// Deliver a pointer event to the surface
    Fire { fire: LayerEvent },
    /// Attach the surface at this point instead of before the first step
    AttachSurface { attach_surface: bool },
    Command(StoreCommand),
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse script {:?}", path))
}

#[derive(Debug, Default, Serialize)]
pub struct StepRecord {
    pub step: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CommandOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ReconcileReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listeners_fired: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Final state after a replay.
#[derive(Debug, Serialize)]
pub struct ReplayOutput {
    pub steps: Vec<StepRecord>,
    pub directives: Vec<RenderDirective>,
    /// Surface layer ids, bottom to top
    pub surface_layers: Vec<String>,
    pub surface_sources: Vec<String>,
    pub clicks: Vec<LayerEvent>,
}

/// Run every step in order. A failing step is recorded and skipped.
pub async fn replay(config: &SessionConfig, steps: Vec<ScriptStep>) -> Result<ReplayOutput> {
    let mut session = MapSession::new(config.sync.clone());
    let mut clicks_rx = session
        .take_click_events()
        .context("Click events already taken")?;
    let surface = Arc::new(Mutex::new(InMemorySurface::with_sentinel(
        &config.sync.sentinel_layer_id,
    )));

    let attach_later = steps
        .iter()
        .any(|step| matches!(step, ScriptStep::AttachSurface { .. }));
    if !attach_later {
        session.attach_surface(surface.clone()).await?;
    }

    let mut records = Vec::with_capacity(steps.len());
    for (index, step) in steps.into_iter().enumerate() {
        let mut record = StepRecord {
            step: index,
            ..Default::default()
        };

        let command = match step {
            ScriptStep::Fire { fire } => {
                record.listeners_fired = Some(surface.lock().await.fire(&fire));
                records.push(record);
                continue;
            }
            ScriptStep::AttachSurface { attach_surface } => {
                if attach_surface && !session.slot().is_ready() {
                    record.report = Some(session.attach_surface(surface.clone()).await?);
                }
                records.push(record);
                continue;
            }
            ScriptStep::AddFromCatalog { add_from_catalog } => {
                match config.catalog_layers(&add_from_catalog) {
                    Ok(layers) => StoreCommand::AddRasterLayers { layers },
                    Err(err) => {
                        warn!(step = index, error = %err, "Catalog lookup failed");
                        record.error = Some(err.to_string());
                        records.push(record);
                        continue;
                    }
                }
            }
            ScriptStep::Command(command) => command,
        };

        match session.dispatch(command).await {
            Ok(update) => {
                record.outcome = update.outcomes.first().copied();
                record.report = update.report;
            }
            Err(err) => {
                warn!(step = index, error = %err, "Command failed");
                record.error = Some(err.to_string());
            }
        }
        records.push(record);
    }

    let mut clicks = Vec::new();
    while let Ok(event) = clicks_rx.try_recv() {
        clicks.push(event);
    }

    let guard = surface.lock().await;
    info!(
        steps = records.len(),
        layers = guard.layer_ids().len(),
        "Replay finished"
    );
    Ok(ReplayOutput {
        steps: records,
        directives: session.directives(),
        surface_layers: guard.layer_ids(),
        surface_sources: guard.source_ids(),
        clicks,
    })
}
