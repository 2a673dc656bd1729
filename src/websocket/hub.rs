//! WebSocket Connection Hub
//!
//! Tracks every open dashboard connection and its topic subscriptions, and
//! fans broadcast events out to the subscribers of a topic. Chart frames
//! do not go through the hub: each connection's session sends its own.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::messages::{ServerMessage, WsEvent, TOPIC_READINGS, TOPIC_SYSTEM};

/// Unique identifier for a WebSocket connection
pub type ConnectionId = String;

/// Manages all WebSocket connections and subscriptions
pub struct ConnectionHub {
    state: Arc<HubState>,
    config: HubConfig,
}

/// Configuration for the connection hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of concurrent connections
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// Handle for sending messages to a specific connection
pub struct ConnectionHandle {
    /// Channel sender for this connection
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    /// Topics this connection is subscribed to
    pub subscriptions: HashSet<String>,
}

/// Maps shared with spawned broadcast tasks
#[derive(Default)]
struct HubState {
    /// Active connections: ConnectionId → ConnectionHandle
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Topic subscriptions: Topic → Set of ConnectionIds
    subscriptions: RwLock<HashMap<String, HashSet<ConnectionId>>>,
}

impl HubState {
    /// Send an event to every subscriber of its topic; returns the count
    async fn broadcast(&self, event: &WsEvent) -> usize {
        // Never hold `subscriptions` while waiting on `connections`:
        // subscribe and unsubscribe lock them in the opposite order.
        let ids: Vec<ConnectionId> = match self.subscriptions.read().await.get(&event.topic) {
            Some(ids) => ids.iter().cloned().collect(),
            None => return 0,
        };

        let connections = self.connections.read().await;
        let mut sent_count = 0;
        for id in &ids {
            if let Some(handle) = connections.get(id) {
                if handle.sender.send(event.message.clone()).is_ok() {
                    sent_count += 1;
                }
            }
        }

        if sent_count > 0 {
            tracing::trace!(
                topic = %event.topic,
                subscribers = sent_count,
                "Broadcast event"
            );
        }
        sent_count
    }
}

impl ConnectionHub {
    /// Create a new connection hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            state: Arc::new(HubState::default()),
            config,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a new WebSocket connection
    ///
    /// Returns the connection ID on success, or an error if the connection
    /// limit has been reached.
    pub async fn register(
        &self,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let mut connections = self.state.connections.write().await;
        if connections.len() >= self.config.max_connections {
            return Err(HubError::TooManyConnections(self.config.max_connections));
        }

        let id = Uuid::new_v4().to_string();
        connections.insert(
            id.clone(),
            ConnectionHandle {
                sender,
                subscriptions: HashSet::new(),
            },
        );

        tracing::info!(connection_id = %id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.state.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.state.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to topics; unknown topics are skipped
    pub async fn subscribe(
        &self,
        id: &str,
        topics: Vec<String>,
    ) -> Result<Vec<String>, HubError> {
        let mut connections = self.state.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.state.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_valid_topic(&topic) {
                tracing::warn!(topic = %topic, "Invalid topic ignored");
                continue;
            }

            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone())
                .or_default()
                .insert(id.to_string());

            subscribed.push(topic);
        }

        tracing::debug!(
            connection_id = %id,
            topics = ?subscribed,
            "Subscribed to topics"
        );

        Ok(subscribed)
    }

    /// Unsubscribe a connection from topics
    pub async fn unsubscribe(
        &self,
        id: &str,
        topics: Vec<String>,
    ) -> Result<Vec<String>, HubError> {
        let mut connections = self.state.connections.write().await;
        let handle = connections
            .get_mut(id)
            .ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.state.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(
            connection_id = %id,
            topics = ?unsubscribed,
            "Unsubscribed from topics"
        );

        Ok(unsubscribed)
    }

    /// Broadcast an event to all subscribers of its topic
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        self.state.broadcast(event).await
    }

    /// Broadcast without waiting
    ///
    /// Called from request handlers after a reading is stored.
    pub fn publish(&self, event: WsEvent) {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            state.broadcast(&event).await;
        });
    }

    /// Send a message directly to a specific connection
    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.state.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle
            .sender
            .send(message)
            .map_err(|_| HubError::SendFailed)
    }

    /// Get the current connection count
    pub async fn connection_count(&self) -> usize {
        self.state.connections.read().await.len()
    }

    /// Get subscription count for a topic
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.state
            .subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

fn is_valid_topic(topic: &str) -> bool {
    topic == TOPIC_READINGS || topic == TOPIC_SYSTEM
}

/// Errors that can occur in the connection hub
#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::Reading;

    #[test]
    fn test_default_config() {
        assert_eq!(HubConfig::default().max_connections, 1000);
    }

    #[test]
    fn test_valid_topics() {
        assert!(is_valid_topic("readings"));
        assert!(is_valid_topic("system"));

        assert!(!is_valid_topic("readings.*"));
        assert!(!is_valid_topic(""));
        assert!(!is_valid_topic("metrics.mood"));
    }

    #[tokio::test]
    async fn test_register_unregister() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();
        assert!(!id.is_empty());
        assert_eq!(hub.connection_count().await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_unsubscribe() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register(tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["readings".to_string(), "bogus".to_string()])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["readings"]);
        assert_eq!(hub.subscription_count("readings").await, 1);

        let unsubscribed = hub
            .unsubscribe(&id, vec!["readings".to_string()])
            .await
            .unwrap();
        assert_eq!(unsubscribed, vec!["readings"]);
        assert_eq!(hub.subscription_count("readings").await, 0);

        hub.unregister(&id).await;
    }

    #[tokio::test]
    async fn test_subscribe_unknown_connection() {
        let hub = ConnectionHub::new(HubConfig::default());
        let result = hub.subscribe("missing", vec!["readings".to_string()]).await;
        assert!(matches!(result, Err(HubError::ConnectionNotFound)));
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig { max_connections: 2 });

        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();
        let (tx3, _) = mpsc::unbounded_channel();

        let id1 = hub.register(tx1).await.unwrap();
        let id2 = hub.register(tx2).await.unwrap();
        let result = hub.register(tx3).await;

        assert!(matches!(result, Err(HubError::TooManyConnections(2))));

        hub.unregister(&id1).await;
        hub.unregister(&id2).await;
    }

    #[tokio::test]
    async fn test_broadcast_to_subscribers() {
        let hub = ConnectionHub::new(HubConfig::default());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let id1 = hub.register(tx1).await.unwrap();
        let id2 = hub.register(tx2).await.unwrap();

        hub.subscribe(&id1, vec!["readings".to_string()])
            .await
            .unwrap();

        let sent = hub.broadcast(&WsEvent::reading(Reading::new(8, 1))).await;
        assert_eq!(sent, 1);

        assert!(matches!(
            rx1.try_recv(),
            Ok(ServerMessage::Reading { .. })
        ));
        assert!(rx2.try_recv().is_err());

        hub.unregister(&id1).await;
        hub.unregister(&id2).await;
    }

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, vec!["system".to_string()]).await.unwrap();

        hub.publish(WsEvent::system("hello"));

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::System { .. }));
    }

    #[tokio::test]
    async fn test_send_to() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();

        hub.send_to(&id, ServerMessage::Pong).await.unwrap();
        assert!(matches!(rx.try_recv(), Ok(ServerMessage::Pong)));

        let err = hub.send_to("missing", ServerMessage::Pong).await;
        assert!(matches!(err, Err(HubError::ConnectionNotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiting_broadcast_does_not_block_subscribe() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register(tx).await.unwrap();
        hub.subscribe(&id, vec!["readings".to_string()]).await.unwrap();

        // First half of a subscribe: connections held for writing
        let connections = hub.state.connections.write().await;

        let broadcaster = Arc::clone(&hub);
        let broadcast = tokio::spawn(async move {
            broadcaster
                .broadcast(&WsEvent::reading(Reading::new(21, 1000)))
                .await
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Second half: the subscription map must still be free
        let subs = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            hub.state.subscriptions.write(),
        )
        .await;
        assert!(subs.is_ok());
        drop(subs);
        drop(connections);

        let sent = tokio::time::timeout(std::time::Duration::from_secs(1), broadcast)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_broadcast_and_subscribe_finish() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let mut ids = Vec::new();
        let mut receivers = Vec::new();
        for _ in 0..4 {
            let (tx, rx) = mpsc::unbounded_channel();
            ids.push(hub.register(tx).await.unwrap());
            receivers.push(rx);
        }

        let mut tasks = Vec::new();
        for id in ids {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                for _ in 0..200 {
                    hub.subscribe(&id, vec!["readings".to_string()]).await.unwrap();
                    hub.unsubscribe(&id, vec!["readings".to_string()]).await.unwrap();
                }
            }));
        }
        for i in 0..4 {
            let hub = Arc::clone(&hub);
            tasks.push(tokio::spawn(async move {
                for j in 0..200 {
                    hub.broadcast(&WsEvent::reading(Reading::new(j % 100, i * 1000 + j)))
                        .await;
                }
            }));
        }

        let all = futures_util::future::join_all(tasks);
        let results = tokio::time::timeout(std::time::Duration::from_secs(10), all)
            .await
            .expect("hub operations deadlocked");
        assert!(results.into_iter().all(|r| r.is_ok()));
        assert_eq!(hub.connection_count().await, 4);
    }
}
