//! Weatherboard Server
//!
//! Serves the live chart page, the REST API and the WebSocket sessions.
//!
//! Run with: cargo run --bin weatherboard
//!
//! # Configuration
//!
//! Settings come from a TOML file (`--config`, or the default locations
//! searched by `Config::load_default`), then environment variables:
//! - `WEATHERBOARD_DATA_DIR`: Directory holding the document log
//! - `WEATHERBOARD_HOST`: Host to bind to (default: 0.0.0.0)
//! - `WEATHERBOARD_PORT`: Port to listen on (default: 8080)
//! - `WEATHERBOARD_LOG_LEVEL`: Log level for this crate (default: info)
//! - `WEATHERBOARD_LOG_FORMAT`: `pretty` or `json`
//! - `RUST_LOG`: Full filter directive, replaces the level above
//!
//! Command-line flags override both.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weatherboard::api::{serve, AppState};
use weatherboard::config::{Config, LoggingConfig};
use weatherboard::live::LiveChart;
use weatherboard::store::{DocumentStore, LocalStore};

#[derive(Parser)]
#[command(name = "weatherboard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Live temperature chart server")]
struct Args {
    /// Config file (default: search the standard locations)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory holding the document log
    #[arg(long)]
    data_dir: Option<String>,

    /// Keep all documents in memory
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.store.data_dir = data_dir;
    }
    if args.in_memory {
        config.store.persist = false;
    }
    config.validate()?;

    init_tracing(&config.logging);

    tracing::info!("Starting Weatherboard v{}", env!("CARGO_PKG_VERSION"));

    let mut store_config = config.store_config();
    store_config.data_dir = expand_home(&config.store.data_dir);
    if store_config.persist {
        tracing::info!("Data directory: {:?}", store_config.data_dir);
    } else {
        tracing::info!("Running in memory, nothing is persisted");
    }

    let store = Arc::new(LocalStore::open(store_config)?);
    tracing::info!("Store stats: {}", store.stats().await);

    let shared: Arc<dyn DocumentStore> = store.clone();
    let live = LiveChart::new(
        Arc::clone(&shared),
        config.chart.collection.clone(),
        config.chart.window_size,
        config.chart_options(),
    );

    let server_config = config.server_config();
    let state = AppState::with_ws_config(shared, live, server_config.clone(), config.hub_config());

    let result = serve(state, &server_config).await;

    // Ends every chart session's live query
    tracing::info!("Shutting down store...");
    store.shutdown().await?;
    result?;

    tracing::info!("Weatherboard shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("weatherboard={},tower_http=debug", logging.level).into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Resolve a leading `~/` against the home directory
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
