//! WebSocket Message Types
//!
//! Defines all message types exchanged between the dashboard page and the
//! Weatherboard server. Both directions are JSON objects tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::chart::Bar;
use crate::live::SessionFrame;
use crate::reading::Reading;
use crate::store::DocumentId;

/// Topic carrying every stored reading
pub const TOPIC_READINGS: &str = "readings";
/// Topic carrying server lifecycle notices
pub const TOPIC_SYSTEM: &str = "system";

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The "add" control was pressed
    Add,
    /// The "remove" control was pressed
    Remove,
    /// Subscribe to topics for broadcast events
    Subscribe {
        /// Topics to subscribe to (`readings`, `system`)
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe {
        /// Topics to unsubscribe from
        topics: Vec<String>,
    },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
    /// The chart after a push
    Frame {
        /// Markup to place in the page's canvas container
        svg: String,
        bars: Vec<Bar>,
        /// Readings in ascending timestamp order
        window: Vec<Reading>,
    },
    /// This connection's add request was stored
    Appended { id: DocumentId, reading: Reading },
    /// Some client stored a reading (topic `readings`)
    Reading { reading: Reading },
    /// Server notice (topic `system`)
    System { message: String },
    /// Subscription confirmed
    Subscribed {
        /// Topics successfully subscribed to
        topics: Vec<String>,
    },
    /// Unsubscription confirmed
    Unsubscribed {
        /// Topics successfully unsubscribed from
        topics: Vec<String>,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Frame message for one session update
    pub fn frame(frame: &SessionFrame) -> Self {
        ServerMessage::Frame {
            svg: frame.svg(),
            bars: frame.frame.bars.clone(),
            window: frame.window.clone(),
        }
    }
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    /// A reading was stored
    pub fn reading(reading: Reading) -> Self {
        Self {
            topic: TOPIC_READINGS.to_string(),
            message: ServerMessage::Reading { reading },
        }
    }

    /// Create a system event
    pub fn system(message: &str) -> Self {
        Self {
            topic: TOPIC_SYSTEM.to_string(),
            message: ServerMessage::System {
                message: message.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize_add_remove() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "add"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Add));
        let msg: ClientMessage = serde_json::from_str(r#"{"type": "remove"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Remove));
    }

    #[test]
    fn test_client_message_deserialize_subscribe() {
        let json = r#"{"type": "subscribe", "topics": ["readings", "system"]}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Subscribe { topics } => {
                assert_eq!(topics, vec!["readings", "system"]);
            }
            _ => panic!("Expected Subscribe"),
        }
    }

    #[test]
    fn test_client_message_unknown_type() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type": "drop_table"}"#).is_err());
    }

    #[test]
    fn test_server_message_serialize_appended() {
        let msg = ServerMessage::Appended {
            id: DocumentId::from("abc".to_string()),
            reading: Reading::new(21, 1699000000000),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"appended\""));
        assert!(json.contains("\"id\":\"abc\""));
        assert!(json.contains("\"temperature\":21"));
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }

    #[test]
    fn test_ws_event_reading() {
        let event = WsEvent::reading(Reading::new(8, 1699000000000));
        assert_eq!(event.topic, TOPIC_READINGS);
        match event.message {
            ServerMessage::Reading { reading } => assert_eq!(reading.temperature, 8),
            _ => panic!("Expected Reading"),
        }
    }

    #[test]
    fn test_ws_event_system() {
        let event = WsEvent::system("shutting down");
        let json = serde_json::to_string(&event.message).unwrap();
        assert_eq!(json, r#"{"type":"system","message":"shutting down"}"#);
    }
}
