//! Live chart sessions
//!
//! `LiveChart` holds what every viewer shares: the store handle, the
//! collection and the chart options. Each viewer opens a `ChartSession`,
//! which owns one live query and one `ChartBinder` and turns every push
//! into a frame.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::chart::{render_svg, ChartBinder, ChartFrame, ChartOptions, UpdateReport};
use crate::live::error::{LiveError, LiveResult};
use crate::reading::{recent_window, Reading, TEMPERATURE_LIMIT};
use crate::store::{Direction, DocumentId, DocumentStore, Query, Subscription, SubscriptionId};

/// Collection readings are written to
pub const DEFAULT_COLLECTION: &str = "weather";
/// Number of readings shown at once
pub const DEFAULT_WINDOW_SIZE: usize = 10;
/// Field the window is ordered by
pub const ORDER_FIELD: &str = "timestamp";

/// A reading as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendedReading {
    pub id: DocumentId,
    pub seq: u64,
    pub reading: Reading,
}

/// Shared entry point for writes and chart sessions
pub struct LiveChart {
    store: Arc<dyn DocumentStore>,
    collection: String,
    window_size: usize,
    options: ChartOptions,
}

impl LiveChart {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: impl Into<String>,
        window_size: usize,
        options: ChartOptions,
    ) -> Self {
        Self {
            store,
            collection: collection.into(),
            window_size,
            options,
        }
    }

    /// `weather` collection, window of 10, default chart
    pub fn with_defaults(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(
            store,
            DEFAULT_COLLECTION,
            DEFAULT_WINDOW_SIZE,
            ChartOptions::default(),
        )
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Newest readings first, limited to the window size
    pub fn window_query(&self) -> Query {
        Query::collection(&self.collection)
            .order_by(ORDER_FIELD, Direction::Desc)
            .limit(self.window_size)
    }

    /// Write one random reading stamped with the current time
    pub async fn on_add_clicked(&self) -> LiveResult<AppendedReading> {
        self.append(Reading::random()).await
    }

    /// Write a given reading
    pub async fn append(&self, reading: Reading) -> LiveResult<AppendedReading> {
        if !(0..TEMPERATURE_LIMIT).contains(&reading.temperature) {
            return Err(LiveError::InvalidReading(format!(
                "temperature {} outside [0, {})",
                reading.temperature, TEMPERATURE_LIMIT
            )));
        }

        let doc = self
            .store
            .append(&self.collection, reading.to_fields())
            .await
            .map_err(|e| {
                tracing::error!(collection = %self.collection, error = %e, "Failed to write reading");
                e
            })?;

        tracing::info!(
            collection = %self.collection,
            seq = doc.seq,
            temperature = reading.temperature,
            timestamp = reading.timestamp,
            "Reading added"
        );

        Ok(AppendedReading {
            id: doc.id,
            seq: doc.seq,
            reading,
        })
    }

    /// The remove control has no store interaction
    pub fn on_remove_clicked(&self) {
        tracing::debug!(collection = %self.collection, "Remove clicked (no-op)");
    }

    /// Current window in ascending timestamp order
    pub async fn recent_window(&self) -> LiveResult<Vec<Reading>> {
        let snapshot = self.store.query(&self.window_query()).await?;
        Ok(recent_window(&snapshot))
    }

    /// Register the live query for a new viewer
    pub async fn open_session(&self) -> LiveResult<ChartSession> {
        let subscription = self.store.subscribe(self.window_query()).await?;
        tracing::debug!(
            subscription_id = subscription.id(),
            collection = %self.collection,
            "Chart session opened"
        );
        Ok(ChartSession::new(
            subscription,
            ChartBinder::new(self.options.clone()),
        ))
    }

    /// SVG of the current window with every bar at its final size
    pub async fn snapshot_svg(&self) -> LiveResult<String> {
        let window = self.recent_window().await?;
        let mut binder = ChartBinder::new(self.options.clone());
        binder.update(&window);
        Ok(render_svg(&binder.settled_frame()))
    }
}

/// One frame produced from one push
#[derive(Debug, Clone, Serialize)]
pub struct SessionFrame {
    /// Ascending readings the frame was built from
    pub window: Vec<Reading>,
    pub frame: ChartFrame,
    pub report: UpdateReport,
}

impl SessionFrame {
    pub fn svg(&self) -> String {
        render_svg(&self.frame)
    }
}

/// A viewer's live query plus its chart state
///
/// Pushes are applied one at a time in arrival order.
#[derive(Debug)]
pub struct ChartSession {
    subscription: Subscription,
    binder: ChartBinder,
    last_error: Option<String>,
}

impl ChartSession {
    fn new(subscription: Subscription, binder: ChartBinder) -> Self {
        Self {
            subscription,
            binder,
            last_error: None,
        }
    }

    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription.id()
    }

    pub fn binder(&self) -> &ChartBinder {
        &self.binder
    }

    /// Wait for the next push and apply it
    ///
    /// Returns `None` once the store has ended the live query. Cancel-safe.
    pub async fn next_frame(&mut self) -> Option<SessionFrame> {
        let snapshot = self.subscription.next().await?;
        let window = recent_window(&snapshot);
        let report = self.binder.update(&window);

        Some(SessionFrame {
            frame: self.binder.frame(),
            window,
            report,
        })
    }

    /// Keep the latest failure for the viewer
    pub fn record_error(&mut self, err: &LiveError) {
        self.last_error = Some(err.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// End the live query
    pub fn close(self) {
        tracing::debug!(
            subscription_id = self.subscription.id(),
            "Chart session closed"
        );
        self.subscription.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{LocalStore, StoreError};
    use serde_json::json;

    fn live() -> (Arc<LocalStore>, LiveChart) {
        let store = Arc::new(LocalStore::in_memory());
        let chart = LiveChart::with_defaults(store.clone());
        (store, chart)
    }

    #[tokio::test]
    async fn test_add_writes_one_reading() {
        let (store, chart) = live();
        let before = chrono::Utc::now().timestamp_millis();
        let added = chart.on_add_clicked().await.unwrap();
        let after = chrono::Utc::now().timestamp_millis();

        assert!((0..100).contains(&added.reading.temperature));
        assert!(added.reading.timestamp >= before && added.reading.timestamp <= after);
        assert_eq!(store.stats().await.documents, 1);
    }

    #[tokio::test]
    async fn test_append_rejects_out_of_range() {
        let (store, chart) = live();
        let err = chart.append(Reading::new(100, 1)).await.unwrap_err();
        assert!(matches!(err, LiveError::InvalidReading(_)));
        let err = chart.append(Reading::new(-1, 1)).await.unwrap_err();
        assert!(matches!(err, LiveError::InvalidReading(_)));
        assert_eq!(store.stats().await.documents, 0);
    }

    #[tokio::test]
    async fn test_session_initial_frame_is_empty() {
        let (_store, chart) = live();
        let mut session = chart.open_session().await.unwrap();

        let frame = session.next_frame().await.unwrap();
        assert!(frame.window.is_empty());
        assert!(frame.frame.bars.is_empty());
        assert!(frame.svg().starts_with("<svg"));
    }

    #[tokio::test]
    async fn test_session_frame_per_write() {
        let (_store, chart) = live();
        let mut session = chart.open_session().await.unwrap();
        session.next_frame().await.unwrap();

        chart.append(Reading::new(10, 100)).await.unwrap();
        chart.append(Reading::new(50, 200)).await.unwrap();

        let first = session.next_frame().await.unwrap();
        assert_eq!(first.window, vec![Reading::new(10, 100)]);
        assert_eq!(first.report.entered, 1);

        let second = session.next_frame().await.unwrap();
        assert_eq!(
            second.window,
            vec![Reading::new(10, 100), Reading::new(50, 200)]
        );
        assert_eq!(second.frame.bars.len(), 2);
        assert_eq!(second.report.updated, 1);
        assert_eq!(second.report.entered, 1);
    }

    #[tokio::test]
    async fn test_eleventh_write_drops_oldest() {
        let (_store, chart) = live();
        for i in 0..10 {
            chart.append(Reading::new(i, 1000 + i)).await.unwrap();
        }
        let mut session = chart.open_session().await.unwrap();
        let full = session.next_frame().await.unwrap();
        assert_eq!(full.window.len(), 10);
        assert_eq!(full.window[0].timestamp, 1000);

        chart.append(Reading::new(42, 1010)).await.unwrap();
        let slid = session.next_frame().await.unwrap();
        assert_eq!(slid.window.len(), 10);
        assert_eq!(slid.window[0].timestamp, 1001);
        assert_eq!(slid.window[9], Reading::new(42, 1010));
        assert_eq!(slid.frame.bars.len(), 10);
    }

    #[tokio::test]
    async fn test_old_timestamp_outside_window_does_not_push() {
        let (_store, chart) = live();
        for i in 0..10 {
            chart.append(Reading::new(i, 1000 + i)).await.unwrap();
        }
        let mut session = chart.open_session().await.unwrap();
        session.next_frame().await.unwrap();

        chart.append(Reading::new(1, 5)).await.unwrap();
        assert!(session.subscription.try_next().is_none());
    }

    #[tokio::test]
    async fn test_non_reading_documents_skipped() {
        let (store, chart) = live();
        let mut session = chart.open_session().await.unwrap();
        session.next_frame().await.unwrap();

        let fields = match json!({"timestamp": 7, "note": "calibration"}) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        };
        store.append("weather", fields).await.unwrap();

        let frame = session.next_frame().await.unwrap();
        assert!(frame.window.is_empty());
        assert!(frame.frame.bars.is_empty());
    }

    #[tokio::test]
    async fn test_close_unregisters() {
        let (store, chart) = live();
        let session = chart.open_session().await.unwrap();
        assert_eq!(store.stats().await.live_subscriptions, 1);

        session.close();
        assert_eq!(store.stats().await.live_subscriptions, 0);
    }

    #[tokio::test]
    async fn test_shutdown_ends_session() {
        let (store, chart) = live();
        let mut session = chart.open_session().await.unwrap();
        session.next_frame().await.unwrap();

        store.shutdown().await.unwrap();
        assert!(session.next_frame().await.is_none());

        let err = chart.on_add_clicked().await.unwrap_err();
        assert!(matches!(err, LiveError::Store(StoreError::Closed)));
    }

    #[tokio::test]
    async fn test_error_slot() {
        let (_store, chart) = live();
        let mut session = chart.open_session().await.unwrap();
        assert!(session.last_error().is_none());

        let err = chart.append(Reading::new(500, 1)).await.unwrap_err();
        session.record_error(&err);
        assert!(session.last_error().unwrap().contains("500"));

        session.clear_error();
        assert!(session.last_error().is_none());
    }

    #[tokio::test]
    async fn test_remove_is_inert() {
        let (store, chart) = live();
        chart.append(Reading::new(3, 1)).await.unwrap();
        chart.on_remove_clicked();
        assert_eq!(chart.recent_window().await.unwrap().len(), 1);
        assert_eq!(store.stats().await.documents, 1);
    }

    #[tokio::test]
    async fn test_snapshot_svg_settled() {
        let (_store, chart) = live();
        chart.append(Reading::new(10, 100)).await.unwrap();
        let svg = chart.snapshot_svg().await.unwrap();
        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(!svg.contains("<animate"));
    }

    #[tokio::test]
    async fn test_zero_window_rejected() {
        let store = Arc::new(LocalStore::in_memory());
        let chart = LiveChart::new(store, "weather", 0, ChartOptions::default());
        let err = chart.open_session().await.unwrap_err();
        assert!(matches!(err, LiveError::Store(StoreError::InvalidQuery(_))));
    }
}
