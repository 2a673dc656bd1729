//! Local document store
//!
//! In-memory collections with an optional append-only log for durability
//! and live queries pushed over channels.
//!
//! Thread-safe via Tokio's async RwLock. Pushes are sent while the write
//! lock is held, so each subscription sees results in write order.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::store::error::{StoreError, StoreResult};
use crate::store::log::{DocumentLog, LogSyncMode};
use crate::store::subscription::{ListenerRegistry, Subscription};
use crate::store::types::{Document, DocumentId, Fields, Query, Snapshot, StoreStats};
use crate::store::DocumentStore;

/// Configuration for the local store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory for the document log
    pub data_dir: PathBuf,
    /// Keep an on-disk log (false = memory only)
    pub persist: bool,
    /// Log sync strategy
    pub sync_mode: LogSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("weatherboard_data"),
            persist: true,
            sync_mode: LogSyncMode::Batched,
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Memory-only configuration (nothing touches disk)
    pub fn in_memory() -> Self {
        Self {
            persist: false,
            ..Default::default()
        }
    }

    /// Path of the document log
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("documents.log")
    }
}

struct StoreState {
    /// Collection name → documents in write order
    collections: HashMap<String, Vec<Document>>,
    next_seq: u64,
    log: Option<DocumentLog>,
    closed: bool,
}

/// Document store backed by memory and an optional log file
pub struct LocalStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
    listeners: Arc<ListenerRegistry>,
}

impl LocalStore {
    /// Open the store, replaying the document log if persistence is on
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let mut collections: HashMap<String, Vec<Document>> = HashMap::new();
        let mut next_seq = 0u64;

        let log = if config.persist {
            std::fs::create_dir_all(&config.data_dir)?;
            let (log, recovered) = DocumentLog::open(config.log_path(), config.sync_mode)?;

            if !recovered.is_empty() {
                tracing::info!("Recovered {} documents from log", recovered.len());
            }

            for doc in recovered {
                next_seq = next_seq.max(doc.seq + 1);
                collections
                    .entry(doc.collection.clone())
                    .or_default()
                    .push(doc);
            }
            for documents in collections.values_mut() {
                documents.sort_by_key(|d| d.seq);
            }

            Some(log)
        } else {
            None
        };

        Ok(Self {
            config,
            state: RwLock::new(StoreState {
                collections,
                next_seq,
                log,
                closed: false,
            }),
            listeners: ListenerRegistry::new(),
        })
    }

    /// Memory-only store
    pub fn in_memory() -> Self {
        Self {
            config: StoreConfig::in_memory(),
            state: RwLock::new(StoreState {
                collections: HashMap::new(),
                next_seq: 0,
                log: None,
                closed: false,
            }),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Whether `shutdown` has run
    pub async fn is_closed(&self) -> bool {
        self.state.read().await.closed
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn append(&self, collection: &str, fields: Fields) -> StoreResult<Document> {
        if collection.is_empty() {
            return Err(StoreError::InvalidDocument(
                "collection name cannot be empty".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        if state.closed {
            return Err(StoreError::Closed);
        }

        let doc = Document {
            id: DocumentId::generate(),
            seq: state.next_seq,
            collection: collection.to_string(),
            fields,
        };

        // Log first (durability)
        if let Some(log) = state.log.as_mut() {
            log.append(&doc)?;
        }

        state.next_seq += 1;
        let documents = state.collections.entry(doc.collection.clone()).or_default();
        documents.push(doc.clone());

        tracing::debug!(
            collection = %doc.collection,
            seq = doc.seq,
            id = %doc.id,
            "Document appended"
        );

        self.listeners.notify(&doc.collection, documents);

        Ok(doc)
    }

    async fn query(&self, query: &Query) -> StoreResult<Snapshot> {
        query.validate()?;

        let state = self.state.read().await;
        if state.closed {
            return Err(StoreError::Closed);
        }

        let documents = state
            .collections
            .get(&query.collection)
            .map(|docs| query.evaluate(docs))
            .unwrap_or_default();

        Ok(Snapshot::new(documents))
    }

    async fn subscribe(&self, query: Query) -> StoreResult<Subscription> {
        query.validate()?;

        // Hold the read lock across registration so no append slips in
        // between the initial result and the first notification.
        let state = self.state.read().await;
        if state.closed {
            return Err(StoreError::Closed);
        }

        let initial = state
            .collections
            .get(&query.collection)
            .map(|docs| query.evaluate(docs))
            .unwrap_or_default();

        self.listeners.register(query, initial)
    }

    async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        StoreStats {
            collections: state.collections.len(),
            documents: state.collections.values().map(Vec::len).sum(),
            live_subscriptions: self.listeners.len(),
            log_entries: state.log.as_ref().map(|l| l.entry_count()).unwrap_or(0),
        }
    }

    async fn shutdown(&self) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.closed {
            return Ok(());
        }
        state.closed = true;

        if let Some(log) = state.log.as_mut() {
            log.sync()?;
        }

        let closed = self.listeners.close_all();
        tracing::info!(live_subscriptions = closed, "Document store shut down");
        Ok(())
    }
}
