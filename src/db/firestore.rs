// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed [`DocumentStore`].
//!
//! Field equalities are pushed down into Firestore queries. Array-element
//! conditions have no Firestore equivalent and are checked on the fetched
//! documents. Updates are applied to the fetched fields and written back with
//! a field mask, so fields the update does not name are left as stored.

use super::{Condition, Document, DocumentStore, Filter, Update, UpdateResult};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Prefix of the metadata fields the Firestore deserializer injects.
const FIRESTORE_META_PREFIX: &str = "_firestore_";
const FIRESTORE_ID_FIELD: &str = "_firestore_id";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Connection(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Connection(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client for testing.
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Fetch documents matching `filter`, at most `limit` when given.
    async fn query(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<u32>,
    ) -> Result<Vec<Document>, AppError> {
        let client = self.get_client()?;

        // Lookups by internal key go straight to the document.
        if let Some(key) = filter.pinned_key() {
            let fields: Option<Map<String, Value>> = client
                .fluent()
                .select()
                .by_id_in(collection)
                .obj()
                .one(key)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            return Ok(fields
                .map(|fields| into_document(fields, Some(key)))
                .transpose()?
                .filter(|doc| filter.matches(doc))
                .into_iter()
                .collect());
        }

        let equalities: Vec<(String, Value)> = filter
            .conditions()
            .iter()
            .filter_map(|c| match c {
                Condition::Eq { field, value } => Some((field.clone(), value.clone())),
                _ => None,
            })
            .collect();

        // Element conditions are evaluated here, so a server-side limit
        // could cut off the document that satisfies them.
        let needs_local_check = filter
            .conditions()
            .iter()
            .any(|c| matches!(c, Condition::ElementEq { .. }));

        let query = client.fluent().select().from(collection);

        let rows: Vec<Map<String, Value>> = match (equalities.is_empty(), limit) {
            (true, _) => query.obj().query().await,
            (false, Some(limit)) if !needs_local_check => {
                query
                    .filter(move |q| {
                        q.for_all(
                            equalities
                                .iter()
                                .map(|(field, value)| q.field(field.as_str()).eq(value.clone())),
                        )
                    })
                    .limit(limit)
                    .obj()
                    .query()
                    .await
            }
            (false, _) => {
                query
                    .filter(move |q| {
                        q.for_all(
                            equalities
                                .iter()
                                .map(|(field, value)| q.field(field.as_str()).eq(value.clone())),
                        )
                    })
                    .obj()
                    .query()
                    .await
            }
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        let mut documents = Vec::new();
        for fields in rows {
            let doc = into_document(fields, None)?;
            if filter.matches(&doc) {
                documents.push(doc);
                if limit.is_some_and(|l| documents.len() as u32 >= l) {
                    break;
                }
            }
        }
        Ok(documents)
    }

    // ─── Writes ──────────────────────────────────────────────────

    /// Write `fields` to an existing document, touching only `mask`.
    async fn write_fields(
        &self,
        collection: &str,
        key: &str,
        mask: Vec<String>,
        fields: &Map<String, Value>,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(mask)
            .in_col(collection)
            .document_id(key)
            .object(fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

/// Split Firestore metadata from document fields.
fn into_document(mut fields: Map<String, Value>, key: Option<&str>) -> Result<Document, AppError> {
    let id = fields
        .get(FIRESTORE_ID_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| key.map(str::to_string))
        .ok_or_else(|| AppError::Database("Firestore document without id".to_string()))?;

    fields.retain(|name, _| !name.starts_with(FIRESTORE_META_PREFIX));
    Ok(Document::new(id, fields))
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .query(collection, filter, Some(1))
            .await?
            .into_iter()
            .next())
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError> {
        self.query(collection, filter, None).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<String, AppError> {
        let inserted: Map<String, Value> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .generate_document_id()
            .object(&fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let doc = into_document(inserted, None)?;
        tracing::debug!(collection, key = %doc.key, "Inserted document");
        Ok(doc.key)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateResult, AppError> {
        let Some(mut doc) = self.find_one(collection, filter).await? else {
            if !upsert {
                return Ok(UpdateResult::unmatched());
            }
            let key = self
                .insert_one(collection, update.upsert_fields(filter)?)
                .await?;
            return Ok(UpdateResult::upserted(key));
        };

        update.apply(&mut doc.fields)?;

        let mask = update.touched_fields();
        let changed: Map<String, Value> = mask
            .iter()
            .filter_map(|f| doc.fields.get(f).map(|v| (f.clone(), v.clone())))
            .collect();

        self.write_fields(collection, &doc.key, mask, &changed)
            .await?;
        Ok(UpdateResult::matched())
    }
}
