//! Core data types for the document store
//!
//! - `Document`: a schemaless record stored in a named collection
//! - `Query`: an ordered, limited view over one collection
//! - `Snapshot`: the result set of a query at one point in time

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use uuid::Uuid;

use crate::store::error::{StoreError, StoreResult};

/// Field map of a schemaless document
pub type Fields = serde_json::Map<String, Value>;

/// Unique identifier of a stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A record stored in a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Store-assigned identifier
    pub id: DocumentId,
    /// Generation order, strictly increasing across the whole store
    pub seq: u64,
    /// Collection the document belongs to
    pub collection: String,
    /// Document body
    pub fields: Fields,
}

impl Document {
    /// Numeric value of a field, if present and numeric
    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(Value::as_f64)
    }
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

/// A query over a single collection
///
/// Without an `order_by` field, documents come back in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: String,
    pub order_by: Option<String>,
    pub direction: Direction,
    pub limit: Option<usize>,
}

impl Query {
    /// Query every document of a collection in write order
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: name.into(),
            order_by: None,
            direction: Direction::Asc,
            limit: None,
        }
    }

    /// Builder method: order by a numeric field
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(field.into());
        self.direction = direction;
        self
    }

    /// Builder method: keep at most `limit` documents after ordering
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reject queries that can never be answered
    pub fn validate(&self) -> StoreResult<()> {
        if self.collection.is_empty() {
            return Err(StoreError::InvalidQuery(
                "collection name cannot be empty".to_string(),
            ));
        }
        if self.order_by.as_deref() == Some("") {
            return Err(StoreError::InvalidQuery(
                "order_by field cannot be empty".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(StoreError::InvalidQuery(
                "limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Evaluate the query against the documents of its collection
    ///
    /// Documents missing the order field (or holding a non-numeric value
    /// there) are excluded. Ties on the order field fall back to `seq`
    /// in the same direction.
    pub fn evaluate(&self, documents: &[Document]) -> Vec<Document> {
        let mut matched: Vec<(OrderKey, &Document)> = match &self.order_by {
            Some(field) => documents
                .iter()
                .filter(|doc| doc.collection == self.collection)
                .filter_map(|doc| {
                    doc.fields
                        .get(field)
                        .and_then(OrderKey::from_value)
                        .map(|key| (key, doc))
                })
                .collect(),
            None => documents
                .iter()
                .filter(|doc| doc.collection == self.collection)
                .map(|doc| (OrderKey::Int(0), doc))
                .collect(),
        };

        matched.sort_by(|(a, da), (b, db)| {
            let ordering = a.compare(*b).then(da.seq.cmp(&db.seq));
            match self.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            }
        });

        let limit = self.limit.unwrap_or(usize::MAX);
        matched
            .into_iter()
            .take(limit)
            .map(|(_, doc)| doc.clone())
            .collect()
    }
}

/// Value of the order field
///
/// Integers compare exactly so timestamps beyond 2^53 keep their order.
#[derive(Debug, Clone, Copy)]
enum OrderKey {
    Int(i64),
    Float(f64),
}

impl OrderKey {
    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_i64()
            .map(OrderKey::Int)
            .or_else(|| value.as_f64().map(OrderKey::Float))
    }

    fn as_f64(self) -> f64 {
        match self {
            OrderKey::Int(v) => v as f64,
            OrderKey::Float(v) => v,
        }
    }

    fn compare(self, other: Self) -> Ordering {
        match (self, other) {
            (OrderKey::Int(a), OrderKey::Int(b)) => a.cmp(&b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

/// The result set of a query at a point in time
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Snapshot {
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    /// Document ids in result order
    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }
}

/// Store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub collections: usize,
    pub documents: usize,
    pub live_subscriptions: usize,
    pub log_entries: u64,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Collections: {}, Documents: {}, Live subscriptions: {}, Log entries: {}",
            self.collections, self.documents, self.live_subscriptions, self.log_entries
        )
    }
}

/// Compare two snapshots by document identity only
pub(crate) fn same_ids(documents: &[Document], ids: &[DocumentId]) -> bool {
    documents.len() == ids.len()
        && documents
            .iter()
            .zip(ids)
            .all(|(doc, id)| doc.id == *id)
}
