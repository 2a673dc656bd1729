//! # Weatherboard
//!
//! Live temperature dashboard: readings are written to a document store
//! and the most recent ones are drawn as a bar chart that redraws itself
//! on every change.
//!
//! ## Features
//!
//! - **Document store**: Named collections, ordered/limited queries and live queries
//! - **Durability**: Optional append-only document log with CRC-checked frames
//! - **Charting**: Band/linear scales, nice ticks, data join, SVG output
//! - **Real-time**: One chart session per WebSocket connection
//!
//! ## Modules
//!
//! - [`store`]: Document store gateway and its local implementation
//! - [`chart`]: Scales, data join, axes and SVG rendering
//! - [`live`]: Writes on user actions and per-viewer chart sessions
//! - [`api`]: HTTP server with Axum
//! - [`websocket`]: Connection hub and session handler
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weatherboard::live::LiveChart;
//! use weatherboard::store::{DocumentStore, LocalStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(LocalStore::open(StoreConfig::new("./weatherboard_data"))?);
//!     let live = LiveChart::with_defaults(store.clone());
//!
//!     // One session = one live query plus its chart
//!     let mut session = live.open_session().await?;
//!     live.on_add_clicked().await?;
//!
//!     while let Some(frame) = session.next_frame().await {
//!         println!("{} bars", frame.frame.bars.len());
//!         if frame.window.len() == 1 {
//!             break;
//!         }
//!     }
//!
//!     session.close();
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod chart;
pub mod config;
pub mod live;
pub mod reading;
pub mod store;
pub mod websocket;

// Re-export top-level types for convenience
pub use reading::{recent_window, Reading, TEMPERATURE_LIMIT};

pub use store::{
    Direction, Document, DocumentId, DocumentStore, LocalStore, Query, Snapshot, StoreConfig,
    StoreError, StoreResult, StoreStats, Subscription,
};

pub use chart::{render_svg, reconcile, ChartBinder, ChartFrame, ChartOptions, JoinBy, JoinPlan};

pub use live::{AppendedReading, ChartSession, LiveChart, LiveError, LiveResult, SessionFrame};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};

pub use config::{Config, ConfigError, LoggingConfig};
