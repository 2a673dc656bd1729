//! Weatherboard Document Store
//!
//! The store gateway: named collections of schemaless documents, one-shot
//! queries, and live queries that re-deliver their full result set on
//! every change.
//!
//! - **types**: Documents, queries, snapshots
//! - **subscription**: Owned live-query handles
//! - **log**: Append-only document log for durability
//! - **local**: `LocalStore`, the bundled implementation
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! Write Path:
//!   Fields → Log (fsync) → Collection → Re-evaluate live queries → Push
//!
//! Read Path:
//!   Query → Collection → Order + Limit → Snapshot
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use weatherboard::store::{Direction, DocumentStore, LocalStore, Query, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = LocalStore::open(StoreConfig::new("./data"))?;
//!
//!     let query = Query::collection("weather")
//!         .order_by("timestamp", Direction::Desc)
//!         .limit(10);
//!     let mut live = store.subscribe(query).await?;
//!
//!     while let Some(snapshot) = live.next().await {
//!         println!("{} documents", snapshot.len());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod local;
pub mod log;
pub mod subscription;
pub mod types;

use async_trait::async_trait;

pub use error::{StoreError, StoreResult};
pub use local::{LocalStore, StoreConfig};
pub use log::{DocumentLog, LogEntry, LogSyncMode};
pub use subscription::{Subscription, SubscriptionId};
pub use types::{Direction, Document, DocumentId, Fields, Query, Snapshot, StoreStats};

/// The store gateway used by the rest of the application
///
/// Implementations must deliver pushes for a single subscription in write
/// order and must send the current result set immediately on `subscribe`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a record under `collection` and assign its generation order
    async fn append(&self, collection: &str, fields: Fields) -> StoreResult<Document>;

    /// Evaluate a query once
    async fn query(&self, query: &Query) -> StoreResult<Snapshot>;

    /// Register a standing live query
    async fn subscribe(&self, query: Query) -> StoreResult<Subscription>;

    async fn stats(&self) -> StoreStats;

    /// Flush pending writes and end every live query
    async fn shutdown(&self) -> StoreResult<()>;
}
