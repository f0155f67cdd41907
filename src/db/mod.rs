//! Database layer.
//!
//! The sync engine talks to storage through [`DocumentStore`], a small
//! document-oriented contract (find/insert/update with field filters and
//! set/push updates). [`FirestoreDb`] backs it in production and
//! [`InMemoryStore`] in tests.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::{InMemoryStore, StoreOp};

use crate::error::AppError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    /// Effort time series (keyed by `segment_id`)
    pub const EFFORTS: &str = "effort_stats";
    /// Segment snapshots (keyed by logical `id`)
    pub const SEGMENTS: &str = "segments";
    /// Trail areas (read-only)
    pub const AREAS: &str = "areas";
}

/// A stored document: the engine's internal key plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(key: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            key: key.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Parse the fields into a typed record.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.fields.clone()))
            .map_err(|e| AppError::Malformed(format!("document {}: {}", self.key, e)))
    }
}

/// Serialize a typed record into a document field map.
pub fn to_fields<T: Serialize>(record: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(record)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize document: {}", e)))?
    {
        Value::Object(fields) => Ok(fields),
        other => Err(AppError::Internal(anyhow::anyhow!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// One clause of a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The document's internal storage key equals this value.
    Key(String),
    /// A top-level field equals this value.
    Eq { field: String, value: Value },
    /// An array field holds an object whose `field` equals `value`.
    ElementEq {
        array: String,
        field: String,
        value: Value,
    },
}

impl Condition {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Key(key) => doc.key == *key,
            Condition::Eq { field, value } => doc.get(field) == Some(value),
            Condition::ElementEq {
                array,
                field,
                value,
            } => doc
                .get(array)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| item.get(field) == Some(value))),
        }
    }
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Match all documents.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match the document with this internal key.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            conditions: vec![Condition::Key(key.into())],
        }
    }

    /// Match documents whose `field` equals `value`.
    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and_field_eq(field, value)
    }

    pub fn and_field_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Additionally require an element of `array` with `field == value`.
    pub fn and_element_eq(
        mut self,
        array: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions.push(Condition::ElementEq {
            array: array.into(),
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The internal key this filter pins, if any.
    pub fn pinned_key(&self) -> Option<&str> {
        self.conditions.iter().find_map(|c| match c {
            Condition::Key(key) => Some(key.as_str()),
            _ => None,
        })
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }

    /// Top-level field equalities, used to seed a document on upsert.
    fn equalities(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().filter_map(|c| match c {
            Condition::Eq { field, value } => Some((field.as_str(), value)),
            _ => None,
        })
    }
}

/// One field operation of an [`Update`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    /// Replace a top-level field.
    Set { field: String, value: Value },
    /// Append to a top-level array field, creating it if absent.
    Push { field: String, value: Value },
    /// Set `field` on the first element of `array` whose `key` equals
    /// `key_value`. Other elements are left as stored.
    SetElement {
        array: String,
        key: String,
        key_value: Value,
        field: String,
        value: Value,
    },
}

impl UpdateOp {
    fn field(&self) -> &str {
        match self {
            UpdateOp::Set { field, .. } | UpdateOp::Push { field, .. } => field,
            UpdateOp::SetElement { array, .. } => array,
        }
    }
}

/// A list of field operations applied to a single document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn set(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_set(field, value)
    }

    pub fn push(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_push(field, value)
    }

    /// Set every field in `fields`.
    pub fn set_all(fields: Map<String, Value>) -> Self {
        Self {
            ops: fields
                .into_iter()
                .map(|(field, value)| UpdateOp::Set { field, value })
                .collect(),
        }
    }

    pub fn and_set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn and_push(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Set `field` on the element of `array` whose `key` equals `key_value`.
    pub fn set_element(
        array: impl Into<String>,
        key: impl Into<String>,
        key_value: impl Into<Value>,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            ops: vec![UpdateOp::SetElement {
                array: array.into(),
                key: key.into(),
                key_value: key_value.into(),
                field: field.into(),
                value: value.into(),
            }],
        }
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Top-level fields this update writes, in first-touched order.
    pub fn touched_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = Vec::new();
        for op in &self.ops {
            if !fields.iter().any(|f| f == op.field()) {
                fields.push(op.field().to_string());
            }
        }
        fields
    }

    /// Apply the operations to a document's fields.
    ///
    /// Fields not named by the update are left untouched.
    pub fn apply(&self, fields: &mut Map<String, Value>) -> Result<(), AppError> {
        for op in &self.ops {
            match op {
                UpdateOp::Set { field, value } => {
                    fields.insert(field.clone(), value.clone());
                }
                UpdateOp::Push { field, value } => {
                    let slot = fields
                        .entry(field.clone())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if slot.is_null() {
                        *slot = Value::Array(Vec::new());
                    }
                    match slot {
                        Value::Array(items) => items.push(value.clone()),
                        other => {
                            return Err(AppError::Malformed(format!(
                                "cannot push onto non-array field {} ({})",
                                field, other
                            )))
                        }
                    }
                }
                UpdateOp::SetElement {
                    array,
                    key,
                    key_value,
                    field,
                    value,
                } => {
                    let element = fields
                        .get_mut(array)
                        .and_then(Value::as_array_mut)
                        .and_then(|items| {
                            items
                                .iter_mut()
                                .find(|item| item.get(key) == Some(key_value))
                        })
                        .and_then(Value::as_object_mut)
                        .ok_or_else(|| {
                            AppError::Malformed(format!(
                                "no element of {} with {} = {}",
                                array, key, key_value
                            ))
                        })?;
                    element.insert(field.clone(), value.clone());
                }
            }
        }
        Ok(())
    }

    /// Fields for a document created by an upsert that matched nothing.
    pub fn upsert_fields(&self, filter: &Filter) -> Result<Map<String, Value>, AppError> {
        let mut fields: Map<String, Value> = filter
            .equalities()
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect();
        self.apply(&mut fields)?;
        Ok(fields)
    }
}

/// Outcome of [`DocumentStore::update_one`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Number of documents the filter matched (0 or 1)
    pub matched: u64,
    /// Key of the document an upsert created, if any
    pub upserted_key: Option<String>,
}

impl UpdateResult {
    pub fn matched() -> Self {
        Self {
            matched: 1,
            upserted_key: None,
        }
    }

    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn upserted(key: String) -> Self {
        Self {
            matched: 0,
            upserted_key: Some(key),
        }
    }
}

/// Document-store contract consumed by the sync engine.
///
/// Implementations report failures as [`AppError::Database`] (or
/// [`AppError::Connection`] when the store is unreachable); callers never
/// retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// First document matching `filter`, if any.
    async fn find_one(&self, collection: &str, filter: &Filter)
        -> Result<Option<Document>, AppError>;

    /// All documents matching `filter`.
    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError>;

    /// Insert a new document and return its internal key.
    async fn insert_one(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<String, AppError>;

    /// Apply `update` to the first document matching `filter`.
    ///
    /// With `upsert`, a document seeded from the filter's field equalities is
    /// created when nothing matches.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateResult, AppError>;
}

/// Store handle shared by every component of a run.
pub type SharedStore = Arc<dyn DocumentStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        match fields {
            Value::Object(map) => Document::new("k1", map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_filter_matches_fields_and_elements() {
        let d = doc(json!({
            "segment_id": 42,
            "efforts": [
                {"effort_count": 7, "fetch_date": "01-01-2030"},
                {"effort_count": 9, "fetch_date": "02-01-2030"}
            ]
        }));

        assert!(Filter::all().matches(&d));
        assert!(Filter::field_eq("segment_id", 42u64).matches(&d));
        assert!(!Filter::field_eq("segment_id", 43u64).matches(&d));
        assert!(Filter::field_eq("segment_id", 42u64)
            .and_element_eq("efforts", "fetch_date", "02-01-2030")
            .matches(&d));
        assert!(!Filter::field_eq("segment_id", 42u64)
            .and_element_eq("efforts", "fetch_date", "03-01-2030")
            .matches(&d));
        assert!(Filter::key("k1").matches(&d));
        assert!(!Filter::key("k2").matches(&d));
    }

    #[test]
    fn test_update_sets_only_named_fields() {
        let mut fields = doc(json!({"a": 1, "b": 2})).fields;
        Update::set("a", 10).and_set("c", 3).apply(&mut fields).unwrap();
        assert_eq!(Value::Object(fields), json!({"a": 10, "b": 2, "c": 3}));
    }

    #[test]
    fn test_update_push_creates_and_appends() {
        let mut fields = Map::new();
        Update::push("efforts", json!({"n": 1}))
            .and_push("efforts", json!({"n": 2}))
            .apply(&mut fields)
            .unwrap();
        assert_eq!(fields["efforts"], json!([{"n": 1}, {"n": 2}]));
    }

    #[test]
    fn test_update_push_rejects_non_array() {
        let mut fields = doc(json!({"efforts": "oops"})).fields;
        let err = Update::push("efforts", 1).apply(&mut fields).unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }

    #[test]
    fn test_set_element_touches_only_matching_element() {
        let mut fields = doc(json!({
            "efforts": [
                {"effort_count": 7, "fetch_date": "01-01-2030"},
                {"effort_count": 9, "fetch_date": "02-01-2030"}
            ]
        }))
        .fields;

        let update = Update::set_element("efforts", "fetch_date", "01-01-2030", "effort_count", 8);
        update.apply(&mut fields).unwrap();

        assert_eq!(
            fields["efforts"],
            json!([
                {"effort_count": 8, "fetch_date": "01-01-2030"},
                {"effort_count": 9, "fetch_date": "02-01-2030"}
            ])
        );
        assert_eq!(update.touched_fields(), vec!["efforts".to_string()]);
    }

    #[test]
    fn test_set_element_without_match_is_malformed() {
        let mut fields = doc(json!({"efforts": [{"fetch_date": "01-01-2030"}]})).fields;
        let err = Update::set_element("efforts", "fetch_date", "05-01-2030", "effort_count", 1)
            .apply(&mut fields)
            .unwrap_err();
        assert!(matches!(err, AppError::Malformed(_)));
    }

    #[test]
    fn test_upsert_fields_seeded_from_filter() {
        let filter = Filter::field_eq("segment_id", 42u64).and_element_eq("efforts", "fetch_date", "x");
        let fields = Update::push("efforts", json!({"effort_count": 1}))
            .upsert_fields(&filter)
            .unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({"segment_id": 42, "efforts": [{"effort_count": 1}]})
        );
    }

    #[test]
    fn test_touched_fields_deduplicates() {
        let update = Update::set("a", 1).and_push("b", 2).and_set("a", 3);
        assert_eq!(update.touched_fields(), vec!["a".to_string(), "b".to_string()]);
    }
}
