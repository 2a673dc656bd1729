//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::reading::Reading;
use crate::store::DocumentId;

// ============================================
// READING DTOs
// ============================================

/// Add reading request; every field is optional
///
/// A missing temperature is drawn at random and a missing timestamp is the
/// current time, the same as pressing "add" on the dashboard.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AddReadingRequest {
    /// Whole degrees Celsius in [0, 100)
    #[serde(default)]
    pub temperature: Option<i64>,
    /// Epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Add reading response
#[derive(Debug, Serialize, Deserialize)]
pub struct AddReadingResponse {
    /// Store-assigned document id
    pub id: DocumentId,
    /// Store generation order
    pub seq: u64,
    /// The reading as written
    pub reading: Reading,
}

/// Current Recent Window
#[derive(Debug, Serialize, Deserialize)]
pub struct RecentResponse {
    pub collection: String,
    pub count: usize,
    /// Ascending by timestamp
    pub readings: Vec<Reading>,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: healthy, unhealthy
    pub status: String,
    /// Store status
    pub store: String,
    /// Stored documents across all collections
    pub documents: usize,
    /// Registered live queries
    pub live_subscriptions: usize,
    /// Open WebSocket connections
    pub ws_connections: usize,
    /// Server uptime in seconds
    pub uptime_seconds: u64,
    /// Application version
    pub version: String,
}
