//! In-memory document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, PoisonError, RwLock};

use crate::models::{Record, UserProfile};
use crate::store::{
    profile_fields, CollectionQuery, Direction, Document, FieldValue, ProfileStore, RecordStore,
    StoreError, USERS_COLLECTION,
};

/// A store holding documents in memory.
///
/// Collections can be marked as failing to exercise error paths.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a store from fixture JSON (collection name → array of documents)
    pub fn from_fixture_str(json: &str) -> Result<Self, StoreError> {
        let raw: HashMap<String, Vec<Map<String, Value>>> = serde_json::from_str(json)?;
        let store = Self::new();
        for (collection, documents) in raw {
            for (index, mut fields) in documents.into_iter().enumerate() {
                let id = match fields.remove("id") {
                    Some(Value::String(id)) => id,
                    Some(other) => other.to_string(),
                    None => format!("{}-{}", collection, index + 1),
                };
                store.insert(&collection, Document::new(id, fields));
            }
        }
        Ok(store)
    }

    /// Load a store from a fixture file
    pub fn from_fixture_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_fixture_str(&content)
    }

    /// Insert a document, replacing any document with the same id
    pub fn insert(&self, collection: &str, document: Document) {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let documents = collections.entry(collection.to_string()).or_default();
        match documents.iter_mut().find(|d| d.id == document.id) {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
    }

    /// Insert a record into the collection of its kind
    pub fn insert_record(&self, record: impl Into<Record>) -> Result<(), StoreError> {
        let record = record.into();
        let mut fields = match serde_json::to_value(&record)? {
            Value::Object(fields) => fields,
            other => {
                return Err(StoreError::Parse(format!(
                    "record serialized to a non-object: {}",
                    other
                )))
            }
        };
        fields.remove("type");
        fields.remove("id");
        self.insert(record.kind().collection(), Document::new(record.id(), fields));
        Ok(())
    }

    /// Fetch one document by id
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned()
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: &str) -> usize {
        let collections = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        collections.get(collection).map_or(0, Vec::len)
    }

    /// Make every read of `collection` fail until restored
    pub fn fail_collection(&self, collection: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection.to_string());
    }

    /// Undo [`InMemoryStore::fail_collection`]
    pub fn restore_collection(&self, collection: &str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(collection);
    }

    fn is_failing(&self, collection: &str) -> bool {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(collection)
    }
}

/// Orders two field values the way an ordered query would: numbers
/// numerically, timestamps chronologically, other strings lexically.
fn compare_fields(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&b.as_f64().unwrap_or(0.0)),
        (Value::String(a), Value::String(b)) => {
            match (
                DateTime::parse_from_rfc3339(a),
                DateTime::parse_from_rfc3339(b),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    async fn get_documents(
        &self,
        collection: &str,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>, StoreError> {
        if self.is_failing(collection) {
            return Err(StoreError::Unavailable(format!(
                "collection '{}' is offline",
                collection
            )));
        }

        let mut documents: Vec<Document> = {
            let collections = self
                .collections
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .filter(|doc| {
                            query.filters.iter().all(|filter| {
                                doc.fields
                                    .get(&filter.field)
                                    .is_some_and(|value| filter.value.matches_json(value))
                            })
                        })
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        if let Some(order) = &query.order_by {
            documents.retain(|doc| {
                doc.fields
                    .get(&order.field)
                    .is_some_and(|value| !value.is_null())
            });
            documents.sort_by(|a, b| {
                let ordering = compare_fields(
                    a.fields.get(&order.field).unwrap_or(&Value::Null),
                    b.fields.get(&order.field).unwrap_or(&Value::Null),
                );
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            documents.truncate(limit);
        }

        Ok(documents)
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn put_profile(
        &self,
        uid: &str,
        profile: &UserProfile,
        _id_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let fields = profile_fields(profile)
            .into_iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect();
        self.insert(USERS_COLLECTION, Document::new(uid, fields));
        Ok(())
    }

    async fn touch_last_login(
        &self,
        uid: &str,
        at: DateTime<Utc>,
        _id_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let document = collections
            .get_mut(USERS_COLLECTION)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == uid))
            .ok_or_else(|| StoreError::NotFound(format!("{}/{}", USERS_COLLECTION, uid)))?;
        document
            .fields
            .insert("lastLogin".to_string(), FieldValue::Timestamp(at).to_json());
        Ok(())
    }
}
