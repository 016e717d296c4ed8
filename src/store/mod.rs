//! Document stores holding marketplace listings and user profiles.
//!
//! This module defines the [`RecordStore`] trait the search pipeline reads
//! through and the [`ProfileStore`] trait the account flows write through.
//! Two implementations ship with the crate:
//!
//! - [`InMemoryStore`]: documents held in memory, loaded from a JSON fixture
//!   file or inserted directly. Used by tests and for offline CLI use.
//! - [`FirestoreStore`]: Cloud Firestore over its REST API.
//!
//! # Fixture Format
//!
//! ```json
//! {
//!   "books": [
//!     { "id": "b1", "title": "Algebra II", "class": "Class 10", "board": "CBSE",
//!       "price": 250, "status": "available", "createdAt": "2024-03-01T10:00:00Z" }
//!   ],
//!   "exchanges": [],
//!   "materials": []
//! }
//! ```
//!
//! Stores only ever hand out snapshots: every call returns freshly built
//! documents that callers own.

mod firestore;
mod memory;

pub use firestore::{decode_value, encode_value, FirestoreStore};
pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::models::{Record, RecordKind, UserProfile};

/// Collection holding one profile document per account
pub const USERS_COLLECTION: &str = "users";

/// A raw stored document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document id (last path segment)
    pub id: String,

    /// Field values, decoded to plain JSON
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Decode this document as a record of the given kind
    pub fn decode(self, kind: RecordKind) -> Result<Record, serde_json::Error> {
        Record::decode(kind, &self.id, self.fields)
    }
}

/// Typed value used in predicates and document writes
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    /// Plain JSON form (timestamps become RFC 3339 strings)
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Integer(i) => Value::from(*i),
            FieldValue::Double(d) => Value::from(*d),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Timestamp(t) => {
                Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            FieldValue::Array(values) => Value::Array(values.iter().map(Self::to_json).collect()),
            FieldValue::Map(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Equality against a plain JSON field value
    pub fn matches_json(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldValue::Null, Value::Null) => true,
            (FieldValue::Bool(a), Value::Bool(b)) => a == b,
            (FieldValue::Integer(a), Value::Number(b)) => match b.as_i64() {
                Some(b) => *a == b,
                None => b.as_f64() == Some(*a as f64),
            },
            (FieldValue::Double(a), Value::Number(b)) => b.as_f64() == Some(*a),
            (FieldValue::String(a), Value::String(b)) => a == b,
            (FieldValue::Timestamp(a), Value::String(b)) => DateTime::parse_from_rfc3339(b)
                .map(|b| b.with_timezone(&Utc) == *a)
                .unwrap_or(false),
            (FieldValue::Array(_), Value::Array(_)) | (FieldValue::Map(_), Value::Object(_)) => {
                self.to_json() == *value
            }
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

/// Sort direction for ordered queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Equality predicate on one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: FieldValue,
}

/// Ordering on one field
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Predicates, ordering and limit for a collection read
///
/// An empty query reads the whole collection in store order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionQuery {
    /// Equality predicates, AND-combined
    pub filters: Vec<FieldFilter>,

    /// Optional ordering; documents missing the field are excluded
    pub order_by: Option<OrderBy>,

    /// Maximum number of documents
    pub limit: Option<usize>,
}

impl CollectionQuery {
    /// Create a query matching every document
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Order by a field
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Limit the number of documents
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Errors that can occur when reading or writing a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with an error status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Document does not exist
    #[error("Document not found: {0}")]
    NotFound(String),

    /// The store cannot serve requests right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Store settings are incomplete
    #[error("Store misconfigured: {0}")]
    Misconfigured(String),

    /// IO error (fixture files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Parse(format!("JSON: {}", err))
    }
}

/// A document collection service the search pipeline reads from.
///
/// Implementations only need [`RecordStore::get_documents`]; decoding into
/// records is shared.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug {
    /// Short identifier for logs ("memory", "firestore")
    fn id(&self) -> &str;

    /// Return a snapshot of the documents in `collection` matching `query`
    async fn get_documents(
        &self,
        collection: &str,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>, StoreError>;

    /// Return a snapshot of the records of `kind` matching `query`.
    ///
    /// Documents that do not decode are skipped with a warning.
    async fn get_collection(
        &self,
        kind: RecordKind,
        query: &CollectionQuery,
    ) -> Result<Vec<Record>, StoreError> {
        let documents = self.get_documents(kind.collection(), query).await?;
        Ok(decode_documents(kind, documents))
    }
}

/// Decode documents of one kind, dropping the ones that do not fit the model
pub fn decode_documents(kind: RecordKind, documents: Vec<Document>) -> Vec<Record> {
    documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match doc.decode(kind) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(
                        collection = kind.collection(),
                        id = %id,
                        "Skipping undecodable document: {}",
                        e
                    );
                    None
                }
            }
        })
        .collect()
}

/// Storage for account profiles written by the signup and login flows
#[async_trait]
pub trait ProfileStore: Send + Sync + std::fmt::Debug {
    /// Create or replace the profile document for `uid`
    async fn put_profile(
        &self,
        uid: &str,
        profile: &UserProfile,
        id_token: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Set `lastLogin` on an existing profile; fails if there is none
    async fn touch_last_login(
        &self,
        uid: &str,
        at: DateTime<Utc>,
        id_token: Option<&str>,
    ) -> Result<(), StoreError>;
}

/// Typed fields of a profile document
pub fn profile_fields(profile: &UserProfile) -> BTreeMap<String, FieldValue> {
    let mut fields = BTreeMap::new();
    fields.insert("email".to_string(), FieldValue::from(profile.email.as_str()));
    fields.insert(
        "firstName".to_string(),
        FieldValue::from(profile.first_name.as_str()),
    );
    fields.insert(
        "lastName".to_string(),
        FieldValue::from(profile.last_name.as_str()),
    );
    fields.insert(
        "studentId".to_string(),
        FieldValue::from(profile.student_id.as_str()),
    );
    fields.insert(
        "emojiNumber".to_string(),
        FieldValue::Integer(i64::from(profile.emoji_number)),
    );
    fields.insert("gender".to_string(), FieldValue::from(profile.gender.as_str()));
    fields.insert("emoji".to_string(), FieldValue::from(profile.emoji.as_str()));
    fields.insert(
        "createdAt".to_string(),
        FieldValue::Timestamp(profile.created_at),
    );
    fields.insert(
        "lastLogin".to_string(),
        FieldValue::Timestamp(profile.last_login),
    );
    fields.insert(
        "totalBooksListed".to_string(),
        FieldValue::Integer(i64::from(profile.total_books_listed)),
    );
    fields.insert(
        "profileComplete".to_string(),
        FieldValue::Bool(profile.profile_complete),
    );
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_field_value_matches_json() {
        assert!(FieldValue::from("available").matches_json(&json!("available")));
        assert!(!FieldValue::from("available").matches_json(&json!("sold")));
        assert!(FieldValue::Integer(3).matches_json(&json!(3)));
        assert!(FieldValue::Integer(3).matches_json(&json!(3.0)));
        assert!(FieldValue::Double(2.5).matches_json(&json!(2.5)));
        assert!(!FieldValue::from("3").matches_json(&json!(3)));

        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert!(FieldValue::Timestamp(at).matches_json(&json!("2024-03-01T10:00:00Z")));
    }

    #[test]
    fn test_collection_query_builder() {
        let query = CollectionQuery::new()
            .where_eq("status", "available")
            .order_by("createdAt", Direction::Descending)
            .limit(8);

        assert_eq!(query.filters.len(), 1);
        assert_eq!(query.filters[0].value, FieldValue::from("available"));
        assert_eq!(
            query.order_by.as_ref().map(|o| o.direction),
            Some(Direction::Descending)
        );
        assert_eq!(query.limit, Some(8));
    }

    #[test]
    fn test_decode_documents_skips_bad_documents() {
        let good = Document::new("b1", json!({ "title": "Algebra" }).as_object().unwrap().clone());
        let bad = Document::new("b2", json!({ "title": 42 }).as_object().unwrap().clone());

        let records = decode_documents(RecordKind::Book, vec![good, bad]);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "b1");
    }

    #[test]
    fn test_profile_fields() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let profile = UserProfile::new(
            "asha@example.com",
            &Default::default(),
            crate::models::Avatar::Female,
            at,
        );
        let fields = profile_fields(&profile);

        assert_eq!(fields["emojiNumber"], FieldValue::Integer(1));
        assert_eq!(fields["lastLogin"], FieldValue::Timestamp(at));
        assert_eq!(fields["profileComplete"], FieldValue::Bool(false));
        assert_eq!(fields.len(), 11);
    }
}
