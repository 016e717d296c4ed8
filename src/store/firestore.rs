//! Cloud Firestore over its REST API.
//!
//! Reads go through `documents:runQuery` with a structured query; profile
//! writes are document PATCHes. Firestore's typed value encoding
//! (`{"stringValue": ...}`, `{"integerValue": "3"}`, ...) is flattened into
//! plain JSON on the way in.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::FirebaseConfig;
use crate::models::UserProfile;
use crate::store::{
    profile_fields, CollectionQuery, Direction, Document, FieldValue, ProfileStore, RecordStore,
    StoreError, USERS_COLLECTION,
};
use crate::utils::HttpClient;

const FIRESTORE_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Firestore document store
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    http: HttpClient,
    base_url: String,
    project_id: String,
    database: String,
    api_key: Option<String>,
    id_token: Option<String>,
}

impl FirestoreStore {
    /// Create a store for a project's default database
    pub fn new(http: HttpClient, project_id: impl Into<String>) -> Self {
        Self {
            http,
            base_url: FIRESTORE_API_BASE.to_string(),
            project_id: project_id.into(),
            database: "(default)".to_string(),
            api_key: None,
            id_token: None,
        }
    }

    /// Create a store from the `[firebase]` settings
    pub fn from_config(config: &FirebaseConfig, http: HttpClient) -> Result<Self, StoreError> {
        let project_id = config
            .project_id
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                StoreError::Misconfigured(
                    "firebase.project_id is not set (or FIREBASE_PROJECT_ID)".to_string(),
                )
            })?;

        let mut store = Self::new(http, project_id);
        store.database = config.database.clone();
        store.api_key = config.api_key.clone();
        Ok(store)
    }

    /// Point the store at another endpoint (emulator or test server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Authenticate requests as a signed-in user
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    fn documents_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/{}/documents",
            self.base_url, self.project_id, self.database
        )
    }

    /// Attach the API key and bearer token to a request
    fn authorize(
        &self,
        builder: reqwest::RequestBuilder,
        id_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let builder = match &self.api_key {
            Some(key) => builder.query(&[("key", key.as_str())]),
            None => builder,
        };
        match id_token.or(self.id_token.as_deref()) {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Build the `structuredQuery` body for a collection read
    fn structured_query(collection: &str, query: &CollectionQuery) -> Value {
        let mut structured = Map::new();
        structured.insert("from".to_string(), json!([{ "collectionId": collection }]));

        let filters: Vec<Value> = query
            .filters
            .iter()
            .map(|f| {
                json!({
                    "fieldFilter": {
                        "field": { "fieldPath": f.field },
                        "op": "EQUAL",
                        "value": encode_value(&f.value),
                    }
                })
            })
            .collect();

        match filters.len() {
            0 => {}
            1 => {
                structured.insert("where".to_string(), filters[0].clone());
            }
            _ => {
                structured.insert(
                    "where".to_string(),
                    json!({ "compositeFilter": { "op": "AND", "filters": filters } }),
                );
            }
        }

        if let Some(order) = &query.order_by {
            let direction = match order.direction {
                Direction::Ascending => "ASCENDING",
                Direction::Descending => "DESCENDING",
            };
            structured.insert(
                "orderBy".to_string(),
                json!([{ "field": { "fieldPath": order.field }, "direction": direction }]),
            );
        }

        if let Some(limit) = query.limit {
            structured.insert("limit".to_string(), json!(limit));
        }

        json!({ "structuredQuery": structured })
    }

    /// Turn a non-success response into an API error
    async fn error_from_response(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);

        if status == 404 {
            StoreError::NotFound(message)
        } else {
            StoreError::Api { status, message }
        }
    }

    async fn patch_document(
        &self,
        path: &str,
        fields: Value,
        params: &[(&str, &str)],
        id_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/{}", self.documents_url(), path);
        let request = self
            .http
            .client()
            .patch(&url)
            .query(params)
            .json(&json!({ "fields": fields }));

        let response = self
            .authorize(request, id_token)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to write {}: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// One element of a `runQuery` response stream
#[derive(Debug, Deserialize)]
struct RunQueryEntry {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

/// Parse a `runQuery` response body into documents.
///
/// Entries without a document (progress markers, empty results) are skipped.
fn parse_run_query(body: &str) -> Result<Vec<Document>, StoreError> {
    let entries: Vec<RunQueryEntry> = serde_json::from_str(body)?;
    Ok(entries
        .into_iter()
        .filter_map(|entry| entry.document)
        .map(|doc| {
            let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
            let fields = doc
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect();
            Document::new(id, fields)
        })
        .collect())
}

/// Encode a value in Firestore's typed REST form
pub fn encode_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Bool(b) => json!({ "booleanValue": b }),
        FieldValue::Integer(i) => json!({ "integerValue": i.to_string() }),
        FieldValue::Double(d) => json!({ "doubleValue": d }),
        FieldValue::String(s) => json!({ "stringValue": s }),
        FieldValue::Timestamp(t) => {
            json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::Micros, true) })
        }
        FieldValue::Array(values) => {
            let values: Vec<Value> = values.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Map(fields) => {
            let fields: Map<String, Value> = fields
                .iter()
                .map(|(k, v)| (k.clone(), encode_value(v)))
                .collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

/// Flatten a Firestore typed value into plain JSON.
///
/// Timestamps stay RFC 3339 strings; unknown encodings become null.
pub fn decode_value(value: &Value) -> Value {
    let Some(object) = value.as_object() else {
        return Value::Null;
    };

    if let Some(b) = object.get("booleanValue") {
        return b.clone();
    }
    if let Some(i) = object.get("integerValue") {
        return match i {
            Value::String(s) => s.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            other => other.clone(),
        };
    }
    if let Some(d) = object.get("doubleValue") {
        return match d {
            // NaN and the infinities arrive as strings
            Value::String(_) => Value::Null,
            other => other.clone(),
        };
    }
    if let Some(t) = object.get("timestampValue") {
        return match t.as_str().map(DateTime::parse_from_rfc3339) {
            Some(Ok(at)) => Value::String(
                at.with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            _ => t.clone(),
        };
    }
    for key in ["stringValue", "bytesValue", "referenceValue"] {
        if let Some(s) = object.get(key) {
            return s.clone();
        }
    }
    if let Some(geo) = object.get("geoPointValue") {
        return geo.clone();
    }
    if let Some(array) = object.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|values| values.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(map) = object.get("mapValue") {
        let fields = map
            .get("fields")
            .and_then(Value::as_object)
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), decode_value(v)))
                    .collect()
            })
            .unwrap_or_default();
        return Value::Object(fields);
    }

    Value::Null
}

#[async_trait]
impl RecordStore for FirestoreStore {
    fn id(&self) -> &str {
        "firestore"
    }

    async fn get_documents(
        &self,
        collection: &str,
        query: &CollectionQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url());
        let body = Self::structured_query(collection, query);

        tracing::debug!(collection, url = %url, "Running Firestore query");

        let request = self.http.client().post(&url).json(&body);
        let response = self
            .authorize(request, None)
            .send()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to query {}: {}", collection, e)))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| StoreError::Network(format!("Failed to read response: {}", e)))?;
        parse_run_query(&text)
    }
}

#[async_trait]
impl ProfileStore for FirestoreStore {
    async fn put_profile(
        &self,
        uid: &str,
        profile: &UserProfile,
        id_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let fields: Map<String, Value> = profile_fields(profile)
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect();
        let path = format!("{}/{}", USERS_COLLECTION, urlencoding::encode(uid));
        self.patch_document(&path, Value::Object(fields), &[], id_token)
            .await
    }

    async fn touch_last_login(
        &self,
        uid: &str,
        at: DateTime<Utc>,
        id_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let fields = json!({ "lastLogin": encode_value(&FieldValue::Timestamp(at)) });
        let path = format!("{}/{}", USERS_COLLECTION, urlencoding::encode(uid));
        self.patch_document(
            &path,
            fields,
            &[
                ("updateMask.fieldPaths", "lastLogin"),
                ("currentDocument.exists", "true"),
            ],
            id_token,
        )
        .await
    }
}
