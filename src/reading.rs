//! Temperature readings
//!
//! A `Reading` is the only record type this application writes. In the
//! store it is a plain document `{"temperature": n, "timestamp": ms}`.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::{Document, Fields, Snapshot};

/// Exclusive upper bound for generated temperatures
pub const TEMPERATURE_LIMIT: i64 = 100;

/// A single temperature reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Whole degrees Celsius
    pub temperature: i64,
    /// Client-side write time, epoch milliseconds
    pub timestamp: i64,
}

impl Reading {
    pub fn new(temperature: i64, timestamp: i64) -> Self {
        Self {
            temperature,
            timestamp,
        }
    }

    /// Random temperature in [0, 100), stamped with the current time
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng(), Utc::now().timestamp_millis())
    }

    /// `floor(random() * 100)` with an explicit source and timestamp
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R, timestamp: i64) -> Self {
        let temperature = (rng.gen::<f64>() * TEMPERATURE_LIMIT as f64).floor() as i64;
        Self::new(temperature, timestamp)
    }

    /// Store representation
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("temperature".to_string(), Value::from(self.temperature));
        fields.insert("timestamp".to_string(), Value::from(self.timestamp));
        fields
    }

    /// Decode a stored document; `None` if it is not a reading
    pub fn from_document(doc: &Document) -> Option<Self> {
        serde_json::from_value(Value::Object(doc.fields.clone())).ok()
    }
}

/// Turn a newest-first snapshot into the ascending display window
///
/// Documents that do not decode as readings are skipped.
pub fn recent_window(snapshot: &Snapshot) -> Vec<Reading> {
    let mut window: Vec<Reading> = snapshot
        .iter()
        .filter_map(|doc| {
            let reading = Reading::from_document(doc);
            if reading.is_none() {
                tracing::warn!(id = %doc.id, "Skipping document that is not a reading");
            }
            reading
        })
        .collect();
    window.reverse();
    window
}
