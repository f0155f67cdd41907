//! In-memory document store.
//!
//! Used by tests. Keeps every operation in a journal so callers
//! can assert exactly which reads and writes a sync performed.

use super::{Document, DocumentStore, Filter, Update, UpdateResult};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A storage operation as seen by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    FindOne {
        collection: String,
        filter: Filter,
    },
    FindMany {
        collection: String,
        filter: Filter,
    },
    InsertOne {
        collection: String,
        fields: Map<String, Value>,
    },
    UpdateOne {
        collection: String,
        filter: Filter,
        update: Update,
        upsert: bool,
    },
}

impl StoreOp {
    pub fn collection(&self) -> &str {
        match self {
            StoreOp::FindOne { collection, .. }
            | StoreOp::FindMany { collection, .. }
            | StoreOp::InsertOne { collection, .. }
            | StoreOp::UpdateOne { collection, .. } => collection,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, StoreOp::InsertOne { .. } | StoreOp::UpdateOne { .. })
    }
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Document>>,
    journal: Vec<StoreOp>,
    next_key: u64,
}

/// Document store held entirely in memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves consistent data behind.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// All documents in a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.lock()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Every operation performed so far.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.lock().journal.clone()
    }

    /// Operations performed against one collection.
    pub fn operations_on(&self, collection: &str) -> Vec<StoreOp> {
        self.lock()
            .journal
            .iter()
            .filter(|op| op.collection() == collection)
            .cloned()
            .collect()
    }

    /// Writes (inserts and updates) performed against one collection.
    pub fn writes_to(&self, collection: &str) -> Vec<StoreOp> {
        self.operations_on(collection)
            .into_iter()
            .filter(StoreOp::is_write)
            .collect()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Seed a document without journaling it.
    pub fn seed(&self, collection: &str, fields: Map<String, Value>) -> String {
        let mut inner = self.lock();
        let key = Self::allocate_key(&mut inner);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(key.clone(), fields));
        key
    }

    fn allocate_key(inner: &mut Inner) -> String {
        inner.next_key += 1;
        format!("doc-{:06}", inner.next_key)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        let mut inner = self.lock();
        inner.journal.push(StoreOp::FindOne {
            collection: collection.to_string(),
            filter: filter.clone(),
        });
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError> {
        let mut inner = self.lock();
        inner.journal.push(StoreOp::FindMany {
            collection: collection.to_string(),
            filter: filter.clone(),
        });
        Ok(inner
            .collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_one(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<String, AppError> {
        let mut inner = self.lock();
        inner.journal.push(StoreOp::InsertOne {
            collection: collection.to_string(),
            fields: fields.clone(),
        });
        let key = Self::allocate_key(&mut inner);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(key.clone(), fields));
        Ok(key)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateResult, AppError> {
        let mut inner = self.lock();
        inner.journal.push(StoreOp::UpdateOne {
            collection: collection.to_string(),
            filter: filter.clone(),
            update: update.clone(),
            upsert,
        });

        let existing = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)));

        if let Some(doc) = existing {
            // Apply to a copy so a failing op leaves the document unchanged.
            let mut fields = doc.fields.clone();
            update.apply(&mut fields)?;
            doc.fields = fields;
            return Ok(UpdateResult::matched());
        }

        if !upsert {
            return Ok(UpdateResult::unmatched());
        }

        let fields = update.upsert_fields(filter)?;
        let key = Self::allocate_key(&mut inner);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(key.clone(), fields));
        Ok(UpdateResult::upserted(key))
    }
}
