//! A store wired to a reconciler.
//!
//! Every command that can change the render directives triggers a
//! recompute and one reconcile pass; batches reconcile once at the end.

use map_common::MapResult;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::SyncConfig;
use crate::derivation::RenderDirective;
use crate::reconciler::{ReconcileReport, Reconciler};
use crate::store::{CommandOutcome, LayerStateStore, StoreCommand};
use crate::surface::{LayerEvent, SurfaceHandle, SurfaceSlot};

/// Result of dispatching one or more commands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUpdate {
    pub outcomes: Vec<CommandOutcome>,
    /// Present when the surface was reconciled
    pub report: Option<ReconcileReport>,
}

pub struct MapSession {
    store: LayerStateStore,
    reconciler: Reconciler,
    config: SyncConfig,
}

impl MapSession {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            store: LayerStateStore::new(),
            reconciler: Reconciler::new(SurfaceSlot::new(), config.clone()),
            config,
        }
    }

    pub fn slot(&self) -> &SurfaceSlot {
        self.reconciler.slot()
    }

    pub fn store(&self) -> &LayerStateStore {
        &self.store
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn directives(&self) -> Vec<RenderDirective> {
        self.store.visible_layer_directives(&self.config)
    }

    /// Hand over the loaded surface and place any deferred layers on it.
    pub async fn attach_surface(&mut self, surface: SurfaceHandle) -> MapResult<ReconcileReport> {
        self.reconciler.slot().attach(surface);
        self.refresh().await
    }

    pub async fn dispatch(&mut self, command: StoreCommand) -> MapResult<SessionUpdate> {
        self.dispatch_batch(vec![command]).await
    }

    /// Apply commands in order, reconciling at most once.
    ///
    /// Stops at the first failing command; commands before it stay applied
    /// and the surface is not reconciled.
    pub async fn dispatch_batch(&mut self, commands: Vec<StoreCommand>) -> MapResult<SessionUpdate> {
        let mut outcomes = Vec::with_capacity(commands.len());
        let mut dirty = false;

        for command in commands {
            let affects = command.affects_directives();
            let outcome = self.store.dispatch(command)?;
            dirty |= affects && outcome == CommandOutcome::Applied;
            outcomes.push(outcome);
        }

        let report = if dirty {
            Some(self.refresh().await?)
        } else {
            None
        };
        debug!(commands = outcomes.len(), reconciled = dirty, "Dispatched");
        Ok(SessionUpdate { outcomes, report })
    }

    /// Recompute directives and reconcile unconditionally.
    pub async fn refresh(&mut self) -> MapResult<ReconcileReport> {
        let directives = self.store.visible_layer_directives(&self.config);
        self.reconciler.reconcile(&directives).await
    }

    pub fn take_click_events(&mut self) -> Option<mpsc::UnboundedReceiver<LayerEvent>> {
        self.reconciler.take_click_events()
    }
}
