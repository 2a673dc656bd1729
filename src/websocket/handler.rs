//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and runs one chart session per
//! connection. The session task owns the live query and the chart binder,
//! so pushes and client actions for a connection are handled one at a time.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::{ConnectionHub, ConnectionId};
use super::messages::{ClientMessage, ServerMessage, WsEvent};
use crate::api::AppState;
use crate::live::{ChartSession, LiveChart};

/// WebSocket upgrade handler
///
/// This is the entry point for WebSocket connections.
/// It upgrades the HTTP connection to WebSocket and starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.ws_hub);
    let live = Arc::clone(&state.live);
    ws.on_upgrade(move |socket| handle_socket(socket, hub, live))
}

fn to_text(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>, live: Arc<LiveChart>) {
    let (mut sender, mut receiver) = socket.split();

    // Create channel for sending messages to this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx.clone()).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            let error_msg = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Some(msg) = to_text(&error_msg) {
                let _ = sender.send(msg).await;
            }
            return;
        }
    };

    let connected_msg = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let sent = match to_text(&connected_msg) {
        Some(msg) => sender.send(msg).await.is_ok(),
        None => false,
    };
    if !sent {
        tracing::error!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    let mut session = match live.open_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(
                connection_id = %connection_id,
                error = %e,
                "Failed to open chart session"
            );
            if let Some(msg) = to_text(&ServerMessage::Error {
                message: e.to_string(),
            }) {
                let _ = sender.send(msg).await;
            }
            hub.unregister(&connection_id).await;
            return;
        }
    };

    let conn_id_for_send = connection_id.clone();

    // Task to forward messages from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Some(text) = to_text(&msg) else {
                continue;
            };
            if sender.send(text).await.is_err() {
                tracing::debug!(
                    connection_id = %conn_id_for_send,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let connection = Connection {
        id: connection_id.clone(),
        hub: Arc::clone(&hub),
        live,
        tx,
    };

    // Task applying pushes and client actions in arrival order
    let mut session_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = session.next_frame() => match frame {
                    Some(frame) => connection.send(ServerMessage::frame(&frame)),
                    None => {
                        tracing::debug!(
                            connection_id = %connection.id,
                            "Live query ended"
                        );
                        let _ = connection.tx.send(ServerMessage::Error {
                            message: "Live query ended".to_string(),
                        });
                        break;
                    }
                },
                incoming = receiver.next() => match incoming {
                    Some(Ok(msg)) => {
                        if !connection.handle_ws_message(&mut session, msg).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!(
                            connection_id = %connection.id,
                            error = %e,
                            "WebSocket receive error"
                        );
                        break;
                    }
                    None => break,
                },
            }
        }
        session.close();
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut send_task => {
            // Aborting drops the session, which ends its live query
            session_task.abort();
        }
        _ = &mut session_task => {
            send_task.abort();
        }
    }

    hub.unregister(&connection_id).await;
}

/// Per-connection context used by the session task
struct Connection {
    id: ConnectionId,
    hub: Arc<ConnectionHub>,
    live: Arc<LiveChart>,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    fn send(&self, message: ServerMessage) {
        if self.tx.send(message).is_err() {
            tracing::debug!(connection_id = %self.id, "Connection channel closed");
        }
    }

    fn send_error(&self, message: impl Into<String>) {
        self.send(ServerMessage::Error {
            message: message.into(),
        });
    }

    /// Handle a received WebSocket message
    ///
    /// Returns false if the connection should be closed.
    async fn handle_ws_message(&self, session: &mut ChartSession, message: Message) -> bool {
        match message {
            Message::Text(text) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => self.handle_client_message(session, client_msg).await,
                    Err(e) => {
                        tracing::debug!(
                            connection_id = %self.id,
                            error = %e,
                            text = %text,
                            "Invalid client message"
                        );
                        // Keep the connection open
                        self.send_error(format!("Invalid message format: {}", e));
                    }
                }
                true
            }
            Message::Binary(_) => {
                self.send_error("Binary messages not supported");
                true
            }
            // Axum answers pings itself
            Message::Ping(_) | Message::Pong(_) => true,
            Message::Close(_) => {
                tracing::debug!(connection_id = %self.id, "Client requested close");
                false
            }
        }
    }

    /// Handle a parsed client message
    async fn handle_client_message(&self, session: &mut ChartSession, message: ClientMessage) {
        match message {
            ClientMessage::Add => match self.live.on_add_clicked().await {
                Ok(appended) => {
                    session.clear_error();
                    self.hub.publish(WsEvent::reading(appended.reading));
                    self.send(ServerMessage::Appended {
                        id: appended.id,
                        reading: appended.reading,
                    });
                }
                Err(e) => {
                    tracing::error!(
                        connection_id = %self.id,
                        error = %e,
                        "Add failed"
                    );
                    session.record_error(&e);
                    self.send_error(e.to_string());
                }
            },
            ClientMessage::Remove => self.live.on_remove_clicked(),
            ClientMessage::Subscribe { topics } => {
                match self.hub.subscribe(&self.id, topics).await {
                    Ok(subscribed) => self.send(ServerMessage::Subscribed { topics: subscribed }),
                    Err(e) => {
                        tracing::error!(
                            connection_id = %self.id,
                            error = %e,
                            "Subscribe error"
                        );
                        self.send_error(e.to_string());
                    }
                }
            }
            ClientMessage::Unsubscribe { topics } => {
                match self.hub.unsubscribe(&self.id, topics).await {
                    Ok(unsubscribed) => self.send(ServerMessage::Unsubscribed {
                        topics: unsubscribed,
                    }),
                    Err(e) => {
                        tracing::error!(
                            connection_id = %self.id,
                            error = %e,
                            "Unsubscribe error"
                        );
                        self.send_error(e.to_string());
                    }
                }
            }
            ClientMessage::Ping => self.send(ServerMessage::Pong),
        }
    }
}
