//! Map session driver.
//!
//! Replays layer store scripts against an in-memory map surface and prints
//! the resulting surface state, derives render directives for a catalog,
//! or runs a live GetFeatureInfo lookup.

mod config;
mod script;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use feature_info::{FeatureInfoQuery, FeatureInfoService, StaticBaseUrl};
use layer_sync::LayerStateStore;
use map_common::{BoundingBox, LayerId, LngLat, LngLatBounds};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::SessionConfig;

#[derive(Parser, Debug)]
#[command(name = "map-session")]
#[command(about = "Drive the raster layer store and surface reconciler")]
struct Args {
    /// Session configuration (sync settings, timeouts, layer catalog)
    #[arg(long, env = "MAP_SESSION_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Print collected metrics in Prometheus format before exiting
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a YAML script of store commands and print the final state
    Replay {
        #[arg(long)]
        script: PathBuf,
    },
    /// Print the render directives for every catalog layer
    Directives {
        /// Selected time for time-filtered layers (RFC 3339)
        #[arg(long)]
        timestamp: Option<DateTime<Utc>>,

        /// Layer that receives the CQL filter
        #[arg(long)]
        filter_layer: Option<String>,

        #[arg(long)]
        cql: Option<String>,
    },
    /// Look up the feature at a point or inside a bounding box
    FeatureInfo {
        /// WMS endpoint
        #[arg(long, env = "WMS_BASE_URL")]
        url: String,

        /// WMS layer name
        #[arg(long)]
        layer: String,

        #[arg(long, requires = "lat")]
        lng: Option<f64>,

        #[arg(long, requires = "lng")]
        lat: Option<f64>,

        /// minLng,minLat,maxLng,maxLat
        #[arg(long, conflicts_with_all = ["lng", "lat"])]
        bbox: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let prometheus = if args.print_metrics {
        Some(
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .context("Failed to install Prometheus recorder")?,
        )
    } else {
        None
    };

    let config = SessionConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Replay { script } => {
            let steps = script::load_script(&script)?;
            info!(script = ?script, steps = steps.len(), "Replaying session script");
            let output = script::replay(&config, steps).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Command::Directives {
            timestamp,
            filter_layer,
            cql,
        } => {
            let mut store = LayerStateStore::new();
            store.set_map_loaded();
            store.set_raster_layers(config.catalog.clone())?;
            store.set_selected_timestamp(timestamp)?;
            if let Some(layer) = filter_layer {
                store.set_filters_layer_id(LayerId::new(layer))?;
            }
            store.set_cql_filter(cql)?;

            let directives = store.visible_layer_directives(&config.sync);
            println!("{}", serde_json::to_string_pretty(&directives)?);
        }
        Command::FeatureInfo {
            url,
            layer,
            lng,
            lat,
            bbox,
        } => {
            let query = match (lng, lat, bbox) {
                (Some(lng), Some(lat), _) => {
                    FeatureInfoQuery::at_point(layer, LngLat::new(lng, lat))
                }
                (_, _, Some(bbox)) => {
                    let bbox = BoundingBox::from_wms_string(&bbox).context("Invalid --bbox")?;
                    FeatureInfoQuery::in_bounds(
                        layer,
                        LngLatBounds::new(
                            LngLat::new(bbox.min_x, bbox.min_y),
                            LngLat::new(bbox.max_x, bbox.max_y),
                        ),
                    )
                }
                _ => bail!("Either --lng/--lat or --bbox is required"),
            };

            let service = FeatureInfoService::new(
                (&config.feature_info).into(),
                Arc::new(StaticBaseUrl(url)),
            )?;
            info!(url = %service.build_url(&query).await?, "Querying feature info");

            match service.fetch_feature_info(&query).await {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => println!("null"),
            }
        }
    }

    if let Some(handle) = prometheus {
        print!("{}", handle.render());
    }
    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays machine-readable.
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}
