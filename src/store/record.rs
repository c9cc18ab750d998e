use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use uuid::Uuid;

use crate::middleware::Session;

/// Fields the store manages itself. They are promoted to columns on the
/// `records` table and never travel inside the document body.
const SYSTEM_FIELDS: &[&str] = &[
    "_id",
    "organizationId",
    "projectSlug",
    "key",
    "createdAt",
    "updatedAt",
];

/// Errors that can occur while normalizing API input into store records
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Invalid identifier: {0}")]
    InvalidId(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// A document as stored: system columns plus the JSONB body
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredRecord {
    pub id: Uuid,
    pub collection: String,
    pub organization_id: Uuid,
    pub project_slug: Option<String>,
    pub key: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub doc: Json<Map<String, Value>>,
}

impl StoredRecord {
    /// Flatten into the API representation: document fields merged with
    /// camelCase system fields. Columns win over any stray duplicates in
    /// the document body.
    pub fn to_api_value(&self) -> Value {
        let mut out = self.doc.0.clone();

        out.insert("_id".to_string(), Value::String(self.id.to_string()));
        out.insert(
            "organizationId".to_string(),
            Value::String(self.organization_id.to_string()),
        );
        if let Some(slug) = &self.project_slug {
            out.insert("projectSlug".to_string(), Value::String(slug.clone()));
        }
        if let Some(key) = self.key {
            out.insert("key".to_string(), Value::Number(key.into()));
        }
        out.insert(
            "createdAt".to_string(),
            Value::String(self.created_at.to_rfc3339()),
        );
        if let Some(updated) = self.updated_at {
            out.insert("updatedAt".to_string(), Value::String(updated.to_rfc3339()));
        }

        Value::Object(out)
    }
}

/// API input normalized for insertion: audit fields attached, system fields
/// stripped, the human-readable key name split out for sequence allocation.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub project_slug: Option<String>,
    /// Key *name* from the request body (e.g. "HOL"). The allocator turns
    /// it into the next integer for the (organization, name, project) scope.
    pub key_name: Option<String>,
    pub doc: Map<String, Value>,
}

impl NewRecord {
    pub fn from_api_input(body: Value, session: &Session) -> Result<Self, RecordError> {
        let mut doc = match body {
            Value::Object(map) => map,
            _ => return Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        };

        let project_slug = match doc.remove("projectSlug") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };

        // A string key is a key *name* requesting a sequence value
        let key_name = match doc.remove("key") {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        };

        for field in SYSTEM_FIELDS {
            if doc.remove(*field).is_some() {
                tracing::debug!("Stripped system field '{}' from create input", field);
            }
        }

        // Session-derived audit fields always win over caller-supplied values
        doc.insert("email".to_string(), Value::String(session.email.clone()));
        doc.insert(
            "reportedBy".to_string(),
            Value::String(session.email.clone()),
        );
        doc.insert(
            "organization".to_string(),
            Value::String(session.organization.clone()),
        );

        Ok(Self {
            project_slug,
            key_name,
            doc,
        })
    }
}

/// API input normalized for update: the target id plus the fields to merge.
/// Identity and creation-time fields can never be overwritten this way.
#[derive(Debug, Clone)]
pub struct UpdatePatch {
    pub id: Uuid,
    pub doc: Map<String, Value>,
}

impl UpdatePatch {
    pub fn from_api_input(body: Value) -> Result<Self, RecordError> {
        let mut doc = match body {
            Value::Object(map) => map,
            _ => return Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        };

        let id_value = doc
            .remove("_id")
            .ok_or_else(|| RecordError::MissingField("_id".to_string()))?;
        let id_str = id_value
            .as_str()
            .ok_or_else(|| RecordError::InvalidId(id_value.to_string()))?;
        let id = parse_record_id(id_str)?;

        // Never let an update rewrite identity or audit fields
        doc.remove("email");
        for field in SYSTEM_FIELDS {
            doc.remove(*field);
        }

        Ok(Self { id, doc })
    }
}

/// Parse a document identifier from client input. Malformed input is a
/// client error, never a panic.
pub fn parse_record_id(input: &str) -> Result<Uuid, RecordError> {
    Uuid::parse_str(input.trim()).map_err(|_| RecordError::InvalidId(input.to_string()))
}

/// Parse a DELETE body: a non-empty JSON array of identifiers
pub fn parse_id_list(body: &Value) -> Result<Vec<Uuid>, RecordError> {
    let items = body
        .as_array()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| RecordError::InvalidJson("Invalid IDs format".to_string()))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| RecordError::InvalidId(item.to_string()))
                .and_then(parse_record_id)
        })
        .collect()
}
