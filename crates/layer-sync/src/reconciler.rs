//! The map container: one [`LayerSync`] per visible layer.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use map_common::{LayerId, MapResult};
use metrics::{counter, gauge};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument};

use crate::config::SyncConfig;
use crate::derivation::RenderDirective;
use crate::surface::{LayerEvent, SurfaceSlot};
use crate::sync::{LayerSync, SyncChange, SyncState};

/// Layers touched by one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub added: Vec<LayerId>,
    pub removed: Vec<LayerId>,
    pub resynced: Vec<LayerId>,
    pub reordered: Vec<LayerId>,
    pub restyled: Vec<LayerId>,
    /// Waiting for the surface to attach
    pub deferred: Vec<LayerId>,
}

impl ReconcileReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.resynced.is_empty()
            && self.reordered.is_empty()
            && self.restyled.is_empty()
            && self.deferred.is_empty()
    }
}

pub struct Reconciler {
    slot: SurfaceSlot,
    config: SyncConfig,
    units: HashMap<LayerId, LayerSync>,
    /// Ids of the last reconciled directives, bottom to top
    order: Vec<LayerId>,
    clicks_tx: mpsc::UnboundedSender<LayerEvent>,
    clicks_rx: Option<mpsc::UnboundedReceiver<LayerEvent>>,
}

impl Reconciler {
    pub fn new(slot: SurfaceSlot, config: SyncConfig) -> Self {
        let (clicks_tx, clicks_rx) = mpsc::unbounded_channel();
        Self {
            slot,
            config,
            units: HashMap::new(),
            order: Vec::new(),
            clicks_tx,
            clicks_rx: Some(clicks_rx),
        }
    }

    pub fn slot(&self) -> &SurfaceSlot {
        &self.slot
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Click events from every clickable layer. Can be taken once.
    pub fn take_click_events(&mut self) -> Option<mpsc::UnboundedReceiver<LayerEvent>> {
        self.clicks_rx.take()
    }

    /// Managed layer ids, bottom to top.
    pub fn layer_ids(&self) -> &[LayerId] {
        &self.order
    }

    pub fn state_of(&self, id: &LayerId) -> Option<SyncState> {
        self.units.get(id).map(|unit| unit.state())
    }

    fn has_deferred(&self) -> bool {
        self.units
            .values()
            .any(|unit| unit.state() == SyncState::Uninitialized)
    }

    /// Bring the surface in line with `directives`.
    #[instrument(skip(self, directives), fields(count = directives.len()))]
    pub async fn reconcile(&mut self, directives: &[RenderDirective]) -> MapResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let wanted: HashSet<&LayerId> = directives.iter().map(|d| &d.layer_id).collect();
        let stale: Vec<LayerId> = self
            .units
            .keys()
            .filter(|id| !wanted.contains(id))
            .cloned()
            .collect();
        for id in stale {
            if let Some(mut unit) = self.units.remove(&id) {
                unit.destroy().await?;
                report.removed.push(id);
            }
        }

        let ready = self.slot.is_ready();

        // Top-down, so every before target is already placed.
        for directive in directives.iter().rev() {
            let id = directive.layer_id.clone();
            let unit = match self.units.entry(id.clone()) {
                Entry::Occupied(entry) => {
                    let unit = entry.into_mut();
                    match unit.update(directive.clone()).await? {
                        SyncChange::Unchanged | SyncChange::Deferred => {}
                        SyncChange::Resynced => report.resynced.push(id.clone()),
                        SyncChange::Adjusted {
                            reordered,
                            restyled,
                        } => {
                            if reordered {
                                report.reordered.push(id.clone());
                            }
                            if restyled {
                                report.restyled.push(id.clone());
                            }
                        }
                    }
                    unit
                }
                Entry::Vacant(entry) => entry.insert(
                    LayerSync::new(directive.clone(), self.config.sentinel_layer_id.clone())
                        .with_click_sink(self.clicks_tx.clone()),
                ),
            };

            if unit.state() == SyncState::Uninitialized {
                if ready {
                    unit.initialize(&self.slot).await?;
                    report.added.push(id);
                } else {
                    report.deferred.push(id);
                }
            }
        }

        // A move can leave a lower neighbour anchored on a stale position.
        if !report.reordered.is_empty() {
            for directive in directives.iter().rev() {
                if let Some(unit) = self.units.get_mut(&directive.layer_id) {
                    unit.reorder().await?;
                }
            }
        }

        self.order = directives.iter().map(|d| d.layer_id.clone()).collect();
        gauge!("layer_sync_layers").set(self.units.len() as f64);
        counter!("layer_sync_reconcile_total").increment(1);

        if !report.is_empty() {
            debug!(
                added = report.added.len(),
                removed = report.removed.len(),
                resynced = report.resynced.len(),
                reordered = report.reordered.len(),
                restyled = report.restyled.len(),
                deferred = report.deferred.len(),
                "Reconciled layers"
            );
        }
        Ok(report)
    }

    /// Reconcile on every observed store revision until the store goes away.
    ///
    /// Bursts of revisions coalesce into one pass. Layers deferred for a
    /// missing surface are initialized as soon as it attaches.
    pub async fn run<F>(
        &mut self,
        mut revisions: watch::Receiver<u64>,
        mut directives: F,
    ) -> MapResult<()>
    where
        F: FnMut() -> Vec<RenderDirective>,
    {
        loop {
            let revision = *revisions.borrow_and_update();
            self.reconcile(&directives()).await?;
            debug!(revision, "Surface reconciled");

            let waiting = self.has_deferred() && !self.slot.is_ready();
            tokio::select! {
                changed = revisions.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = self.slot.ready(), if waiting => {}
            }
        }

        info!("Layer store closed, reconciler stopping");
        Ok(())
    }

    /// Take every managed layer off the surface.
    pub async fn clear(&mut self) -> MapResult<Vec<LayerId>> {
        let mut removed = Vec::with_capacity(self.units.len());
        for (id, mut unit) in self.units.drain() {
            unit.destroy().await?;
            removed.push(id);
        }
        self.order.clear();
        removed.sort();
        Ok(removed)
    }
}
