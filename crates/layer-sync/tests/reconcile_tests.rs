//! End-to-end tests: store commands through to the in-memory surface.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use layer_sync::{
    InMemorySurface, LayerEvent, LayerEventKind, LayerStateStore, MapSession, Reconciler,
    StoreCommand, Surface, SurfaceOp, SurfaceSlot, SyncConfig, SyncState,
    DEFAULT_SENTINEL_LAYER_ID,
};
use map_common::{LayerId, LngLat};
use serde_json::json;
use test_utils::{raster_layer, raster_layers, shared_source_layer, time_layer};
use tokio::sync::Mutex;

const SENTINEL: &str = DEFAULT_SENTINEL_LAYER_ID;

fn surface() -> Arc<Mutex<InMemorySurface>> {
    Arc::new(Mutex::new(InMemorySurface::with_sentinel(SENTINEL)))
}

async fn loaded_session(ids: &[&str]) -> (MapSession, Arc<Mutex<InMemorySurface>>) {
    let mut session = MapSession::new(SyncConfig::default());
    let surface = surface();
    session.attach_surface(surface.clone()).await.unwrap();
    session
        .dispatch_batch(vec![
            StoreCommand::SetMapLoaded,
            StoreCommand::SetRasterLayers {
                layers: raster_layers(ids),
            },
        ])
        .await
        .unwrap();
    (session, surface)
}

#[tokio::test]
async fn test_layers_stack_below_sentinel_in_store_order() {
    let (_session, surface) = loaded_session(&["a", "b", "c"]).await;
    assert_eq!(
        surface.lock().await.layer_ids(),
        vec!["a", "b", "c", SENTINEL]
    );
}

#[tokio::test]
async fn test_move_swaps_paint_order() {
    let (mut session, surface) = loaded_session(&["a", "b"]).await;

    let update = session
        .dispatch(StoreCommand::MoveRasterLayer { from: 0, to: 1 })
        .await
        .unwrap();

    let report = update.report.unwrap();
    assert!(report.added.is_empty());
    assert!(report.removed.is_empty());
    assert!(!report.reordered.is_empty());

    let directives = session.directives();
    assert_eq!(directives[0].layer_id, LayerId::new("b"));
    assert_eq!(directives[0].before_layer_id, Some(LayerId::new("a")));
    assert_eq!(surface.lock().await.layer_ids(), vec!["b", "a", SENTINEL]);
}

#[tokio::test]
async fn test_move_across_a_long_stack() {
    let (mut session, surface) = loaded_session(&["a", "b", "c", "d"]).await;

    session
        .dispatch(StoreCommand::MoveRasterLayer { from: 3, to: 0 })
        .await
        .unwrap();
    assert_eq!(
        surface.lock().await.layer_ids(),
        vec!["d", "a", "b", "c", SENTINEL]
    );

    session
        .dispatch(StoreCommand::MoveRasterLayer { from: 1, to: 3 })
        .await
        .unwrap();
    assert_eq!(
        surface.lock().await.layer_ids(),
        vec!["d", "b", "c", "a", SENTINEL]
    );
}

#[tokio::test]
async fn test_added_layers_land_at_the_bottom() {
    let (mut session, surface) = loaded_session(&["a"]).await;

    session
        .dispatch(StoreCommand::AddRasterLayers {
            layers: raster_layers(&["x", "y"]),
        })
        .await
        .unwrap();
    assert_eq!(
        surface.lock().await.layer_ids(),
        vec!["x", "y", "a", SENTINEL]
    );
}

#[tokio::test]
async fn test_reconcile_twice_changes_nothing() {
    let (mut session, surface) = loaded_session(&["a", "b"]).await;
    surface.lock().await.clear_ops();

    let report = session.refresh().await.unwrap();
    assert!(report.is_empty());
    assert!(surface.lock().await.ops().is_empty());
}

#[tokio::test]
async fn test_removal_leaves_no_orphans() {
    let (mut session, surface) = loaded_session(&["a", "b"]).await;

    session
        .dispatch(StoreCommand::RemoveRasterLayers {
            ids: vec![LayerId::new("a"), LayerId::new("b")],
        })
        .await
        .unwrap();

    let guard = surface.lock().await;
    assert_eq!(guard.layer_ids(), vec![SENTINEL]);
    assert_eq!(guard.source_ids(), vec!["mapbox-gl-draw-cold"]);
}

#[tokio::test]
async fn test_shared_source_outlives_one_layer() {
    let mut session = MapSession::new(SyncConfig::default());
    let surface = surface();
    session.attach_surface(surface.clone()).await.unwrap();
    session
        .dispatch_batch(vec![
            StoreCommand::SetMapLoaded,
            StoreCommand::SetRasterLayers {
                layers: vec![
                    shared_source_layer("depth", "bathymetry"),
                    shared_source_layer("contours", "bathymetry"),
                ],
            },
        ])
        .await
        .unwrap();
    let source_id = session.directives()[0].spec.source.id.clone();
    assert_eq!(surface.lock().await.source_ids().len(), 2);

    session
        .dispatch(StoreCommand::RemoveRasterLayers {
            ids: vec![LayerId::new("depth")],
        })
        .await
        .unwrap();
    assert!(surface.lock().await.has_source(&source_id));

    session
        .dispatch(StoreCommand::RemoveRasterLayers {
            ids: vec![LayerId::new("contours")],
        })
        .await
        .unwrap();
    assert!(!surface.lock().await.has_source(&source_id));
}

#[tokio::test]
async fn test_filter_on_one_sharer_reaches_its_own_source() {
    let mut session = MapSession::new(SyncConfig::default());
    let surface = surface();
    session.attach_surface(surface.clone()).await.unwrap();
    session
        .dispatch_batch(vec![
            StoreCommand::SetMapLoaded,
            StoreCommand::SetRasterLayers {
                layers: vec![
                    shared_source_layer("depth", "bathymetry"),
                    shared_source_layer("contours", "bathymetry"),
                ],
            },
        ])
        .await
        .unwrap();

    session
        .dispatch_batch(vec![
            StoreCommand::SetFiltersLayerId {
                id: LayerId::new("contours"),
            },
            StoreCommand::SetCqlFilter {
                filter: Some("depth > 2".to_string()),
            },
        ])
        .await
        .unwrap();

    let tiles_of = |layer: &str, guard: &InMemorySurface| {
        let source = guard.get_layer(layer).unwrap().source.unwrap();
        guard.source(&source).unwrap().tiles[0].clone()
    };
    {
        let guard = surface.lock().await;
        assert!(tiles_of("contours", &guard).contains("CQL_FILTER=depth+%3E+2"));
        assert!(!tiles_of("depth", &guard).contains("CQL_FILTER"));
        // Draw source plus one source per distinct tile request.
        assert_eq!(guard.source_ids().len(), 3);
        assert_eq!(guard.layer_ids(), vec!["depth", "contours", SENTINEL]);
    }

    // Clearing the filter folds both layers back onto one source.
    session
        .dispatch(StoreCommand::SetCqlFilter { filter: None })
        .await
        .unwrap();
    let guard = surface.lock().await;
    assert!(!tiles_of("contours", &guard).contains("CQL_FILTER"));
    assert_eq!(
        guard.get_layer("depth").unwrap().source,
        guard.get_layer("contours").unwrap().source
    );
    assert_eq!(guard.source_ids().len(), 2);
}

#[tokio::test]
async fn test_opacity_goes_to_paint_property() {
    let (mut session, surface) = loaded_session(&["a", "b"]).await;
    surface.lock().await.clear_ops();

    let update = session
        .dispatch(StoreCommand::UpdateRasterLayerOpacity {
            id: LayerId::new("b"),
            opacity: 0.4,
        })
        .await
        .unwrap();
    assert_eq!(update.report.unwrap().restyled, vec![LayerId::new("b")]);

    let guard = surface.lock().await;
    assert_eq!(guard.paint_property("b", "raster-opacity"), Some(&json!(0.4)));
    assert_eq!(
        guard.ops(),
        &[SurfaceOp::SetPaint {
            id: "b".to_string(),
            property: "raster-opacity".to_string(),
            value: json!(0.4),
        }]
    );
}

#[tokio::test]
async fn test_filter_target_is_clickable() {
    let (mut session, surface) = loaded_session(&["a", "b"]).await;
    let mut clicks = session.take_click_events().unwrap();

    session
        .dispatch(StoreCommand::SetFiltersLayerId {
            id: LayerId::new("a"),
        })
        .await
        .unwrap();

    {
        let mut guard = surface.lock().await;
        assert_eq!(guard.listener_count("a"), 3);
        assert_eq!(guard.listener_count("b"), 0);

        guard.fire(&LayerEvent::new(LayerEventKind::MouseEnter, "a"));
        assert_eq!(guard.cursor(), "pointer");
        guard.fire(&LayerEvent::new(LayerEventKind::MouseLeave, "a"));
        assert_eq!(guard.cursor(), "");
        guard.fire(
            &LayerEvent::new(LayerEventKind::Click, "a").at(LngLat { lng: 5.0, lat: 52.0 }),
        );
    }
    let click = clicks.recv().await.unwrap();
    assert_eq!(click.layer_id, "a");
    assert_eq!(click.lng_lat, Some(LngLat { lng: 5.0, lat: 52.0 }));

    // Moving the filter elsewhere unbinds the old target.
    session
        .dispatch(StoreCommand::SetFiltersLayerId {
            id: LayerId::new("b"),
        })
        .await
        .unwrap();
    let guard = surface.lock().await;
    assert_eq!(guard.listener_count("a"), 0);
    assert_eq!(guard.listener_count("b"), 3);
    assert_eq!(guard.layer_ids(), vec!["a", "b", SENTINEL]);
}

#[tokio::test]
async fn test_cql_filter_reaches_tile_url() {
    let (mut session, surface) = loaded_session(&["a", "b"]).await;

    session
        .dispatch_batch(vec![
            StoreCommand::SetFiltersLayerId {
                id: LayerId::new("b"),
            },
            StoreCommand::SetCqlFilter {
                filter: Some("depth > 2".to_string()),
            },
        ])
        .await
        .unwrap();

    let guard = surface.lock().await;
    assert!(guard.source("b").unwrap().tiles[0].contains("CQL_FILTER=depth+%3E+2"));
    assert!(!guard.source("a").unwrap().tiles[0].contains("CQL_FILTER"));
    assert_eq!(guard.layer_ids(), vec!["a", "b", SENTINEL]);
}

#[tokio::test]
async fn test_timestamp_resyncs_time_filtered_layers_only() {
    let mut session = MapSession::new(SyncConfig::default());
    let surface = surface();
    session.attach_surface(surface.clone()).await.unwrap();
    session
        .dispatch_batch(vec![
            StoreCommand::SetMapLoaded,
            StoreCommand::SetRasterLayers {
                layers: vec![raster_layer("plain"), time_layer("timed")],
            },
        ])
        .await
        .unwrap();

    let update = session
        .dispatch(StoreCommand::SetSelectedTimestamp {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
        })
        .await
        .unwrap();

    let report = update.report.unwrap();
    assert_eq!(report.resynced, vec![LayerId::new("timed")]);
    let guard = surface.lock().await;
    assert!(guard.source("timed").unwrap().tiles[0].contains("phenomenontime+DURING"));
    assert_eq!(guard.layer_ids(), vec!["plain", "timed", SENTINEL]);
}

#[tokio::test]
async fn test_layers_wait_for_surface() {
    let mut session = MapSession::new(SyncConfig::default());
    let update = session
        .dispatch_batch(vec![
            StoreCommand::SetMapLoaded,
            StoreCommand::SetRasterLayers {
                layers: raster_layers(&["a", "b"]),
            },
        ])
        .await
        .unwrap();
    assert_eq!(update.report.unwrap().deferred.len(), 2);
    assert_eq!(
        session.reconciler().state_of(&LayerId::new("a")),
        Some(SyncState::Uninitialized)
    );

    let surface = surface();
    let report = session.attach_surface(surface.clone()).await.unwrap();
    assert_eq!(report.added.len(), 2);
    assert_eq!(
        surface.lock().await.layer_ids(),
        vec!["a", "b", SENTINEL]
    );
}

#[tokio::test]
async fn test_run_loop_follows_store_revisions() {
    let store = Arc::new(std::sync::Mutex::new(LayerStateStore::new()));
    let revisions = store.lock().unwrap().subscribe();
    let config = SyncConfig::default();

    let slot = SurfaceSlot::new();
    let surface = surface();
    slot.attach(surface.clone());

    let runner = {
        let store = Arc::downgrade(&store);
        let slot = slot.clone();
        tokio::spawn(async move {
            let mut reconciler = Reconciler::new(slot, config.clone());
            reconciler
                .run(revisions, move || {
                    store
                        .upgrade()
                        .map(|store| {
                            let guard = store.lock().unwrap();
                            guard.visible_layer_directives(&config)
                        })
                        .unwrap_or_default()
                })
                .await
        })
    };

    {
        let mut guard = store.lock().unwrap();
        guard.set_map_loaded();
        guard.set_raster_layers(raster_layers(&["a", "b"])).unwrap();
        guard.move_raster_layer(0, 1).unwrap();
    }

    let mut placed = false;
    for _ in 0..50 {
        if surface.lock().await.layer_ids() == vec!["b", "a", SENTINEL] {
            placed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(placed);

    drop(store);
    let finished = tokio::time::timeout(Duration::from_secs(1), runner).await;
    assert!(finished.unwrap().unwrap().is_ok());
}
