// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use segment_effort_tracker::db::{
    DocumentStore, Document, Filter, FirestoreDb, InMemoryStore, SharedStore, Update, UpdateResult,
};
use segment_effort_tracker::error::AppError;
use segment_effort_tracker::models::RawSegment;
use segment_effort_tracker::services::{SegmentProvider, SyncOrchestrator};
use segment_effort_tracker::time_utils::FixedClock;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique segment ID for test isolation against a shared emulator.
#[allow(dead_code)]
pub fn unique_segment_id() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64
        % 1_000_000_000_000
}

/// Noon UTC on the given day.
#[allow(dead_code)]
pub fn utc_noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// A minimal Strava segment payload.
#[allow(dead_code)]
pub fn raw_segment(id: u64, name: &str, effort_count: u64) -> RawSegment {
    RawSegment::from_json(json!({
        "id": id,
        "name": name,
        "distance": 2150.0,
        "average_grade": 4.2,
        "start_latlng": [41.70, 2.40],
        "end_latlng": [41.71, 2.41],
        "effort_count": effort_count,
        "athlete_count": 120,
        "star_count": 3,
        "map": {"id": format!("s{}", id), "polyline": "encoded", "resource_state": 3},
        "xoms": {"kom": "4:12", "qom": "5:01"}
    }))
    .unwrap()
}

/// Segment provider serving canned segments.
#[allow(dead_code)]
#[derive(Default)]
pub struct StubProvider {
    segments: Mutex<HashMap<u64, RawSegment>>,
    failure: Mutex<Option<fn() -> AppError>>,
    calls: Mutex<Vec<u64>>,
}

#[allow(dead_code)]
impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segment(self, segment: RawSegment) -> Self {
        self.put(segment);
        self
    }

    pub fn put(&self, segment: RawSegment) {
        self.segments.lock().unwrap().insert(segment.id, segment);
    }

    pub fn set_effort_count(&self, segment_id: u64, effort_count: u64) {
        if let Some(segment) = self.segments.lock().unwrap().get_mut(&segment_id) {
            segment.effort_count = effort_count;
        }
    }

    /// Make every following fetch fail.
    pub fn fail_with(&self, failure: fn() -> AppError) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    pub fn calls(&self) -> Vec<u64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SegmentProvider for StubProvider {
    async fn get_segment(&self, segment_id: u64) -> Result<RawSegment, AppError> {
        self.calls.lock().unwrap().push(segment_id);
        if let Some(failure) = *self.failure.lock().unwrap() {
            return Err(failure());
        }
        self.segments
            .lock()
            .unwrap()
            .get(&segment_id)
            .cloned()
            .ok_or_else(|| AppError::StravaApi(format!("HTTP 404 Not Found: {}", segment_id)))
    }
}

/// Store wrapper whose writes to one collection fail.
#[allow(dead_code)]
#[derive(Clone)]
pub struct FailingStore {
    inner: InMemoryStore,
    failing_collection: String,
}

#[allow(dead_code)]
impl FailingStore {
    pub fn new(inner: InMemoryStore, failing_collection: &str) -> Self {
        Self {
            inner,
            failing_collection: failing_collection.to_string(),
        }
    }

    fn check(&self, collection: &str) -> Result<(), AppError> {
        if collection == self.failing_collection {
            return Err(AppError::Database(format!("write to {} refused", collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FailingStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError> {
        self.inner.find_many(collection, filter).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<String, AppError> {
        self.check(collection)?;
        self.inner.insert_one(collection, fields).await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> Result<UpdateResult, AppError> {
        self.check(collection)?;
        self.inner.update_one(collection, filter, update, upsert).await
    }
}

/// Store wrapper where every document disappears between a read and the
/// following update: reads see the data, updates match nothing.
#[allow(dead_code)]
#[derive(Clone)]
pub struct VanishingStore {
    inner: InMemoryStore,
}

#[allow(dead_code)]
impl VanishingStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for VanishingStore {
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, AppError> {
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, AppError> {
        self.inner.find_many(collection, filter).await
    }

    async fn insert_one(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<String, AppError> {
        self.inner.insert_one(collection, fields).await
    }

    async fn update_one(
        &self,
        _collection: &str,
        _filter: &Filter,
        _update: &Update,
        _upsert: bool,
    ) -> Result<UpdateResult, AppError> {
        Ok(UpdateResult::unmatched())
    }
}

/// Orchestrator wired to in-memory collaborators.
#[allow(dead_code)]
pub struct Harness {
    pub provider: Arc<StubProvider>,
    pub store: InMemoryStore,
    pub clock: Arc<FixedClock>,
    pub orchestrator: SyncOrchestrator,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(provider: StubProvider, now: DateTime<Utc>) -> Self {
        let store = InMemoryStore::new();
        Self::with_store(provider, store.clone(), Arc::new(store), now)
    }

    pub fn with_store(
        provider: StubProvider,
        store: InMemoryStore,
        shared: SharedStore,
        now: DateTime<Utc>,
    ) -> Self {
        let provider = Arc::new(provider);
        let clock = Arc::new(FixedClock::new(now));
        let orchestrator = SyncOrchestrator::new(provider.clone(), shared, clock.clone());
        Self {
            provider,
            store,
            clock,
            orchestrator,
        }
    }
}
