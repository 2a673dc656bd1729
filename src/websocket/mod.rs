//! WebSocket Live Dashboard
//!
//! Streams chart frames to the dashboard page and accepts its button
//! presses.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and topic subscriptions
//! - **Handler**: Upgrades the connection and runs its chart session
//! - **Messages**: Defines client and server message formats
//!
//! ## Topics
//!
//! Every connection receives `frame` messages for its own chart. It can
//! additionally subscribe to:
//! - `readings` - every stored reading, from any client
//! - `system` - server notices
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8080/api/v1/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'frame') canvas.innerHTML = msg.svg;
//! };
//!
//! addButton.onclick = () => ws.send(JSON.stringify({type: 'add'}));
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, ConnectionId, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent, TOPIC_READINGS, TOPIC_SYSTEM};
