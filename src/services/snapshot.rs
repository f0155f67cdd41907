// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Segment snapshot store: one current-state document per segment.

use crate::db::{collections, to_fields, Filter, SharedStore, Update};
use crate::error::AppError;
use crate::models::segment::CURATED_FIELDS;
use crate::models::SegmentSnapshot;

/// Which write the snapshot store performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotWrite {
    Inserted,
    Replaced,
}

/// Owns the `segments` collection.
#[derive(Clone)]
pub struct SnapshotStore {
    store: SharedStore,
}

impl SnapshotStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Load the snapshot for a segment by its logical `id`.
    pub async fn get_snapshot(&self, segment_id: u64) -> Result<Option<SegmentSnapshot>, AppError> {
        self.store
            .find_one(collections::SEGMENTS, &Filter::field_eq("id", segment_id))
            .await?
            .map(|doc| doc.parse::<SegmentSnapshot>())
            .transpose()
    }

    /// Insert the snapshot, or overwrite the existing one in place.
    ///
    /// An existing document keeps its internal key. Every field of
    /// `snapshot` is set except `id` and the editor-curated fields; fields
    /// the snapshot does not carry are left as stored.
    pub async fn replace_snapshot(
        &self,
        segment_id: u64,
        snapshot: &SegmentSnapshot,
    ) -> Result<SnapshotWrite, AppError> {
        let mut fields = to_fields(snapshot)?;

        let existing = self
            .store
            .find_one(collections::SEGMENTS, &Filter::field_eq("id", segment_id))
            .await?;

        let Some(existing) = existing else {
            self.store.insert_one(collections::SEGMENTS, fields).await?;
            tracing::debug!(segment_id, "Segment snapshot inserted");
            return Ok(SnapshotWrite::Inserted);
        };

        fields.remove("id");
        for curated in CURATED_FIELDS {
            fields.remove(*curated);
        }

        let result = self
            .store
            .update_one(
                collections::SEGMENTS,
                &Filter::key(existing.key.clone()),
                &Update::set_all(fields),
                false,
            )
            .await?;

        if result.matched == 0 {
            return Err(AppError::Conflict(format!(
                "segment snapshot {} ({}) disappeared before replace",
                segment_id, existing.key
            )));
        }

        tracing::debug!(segment_id, key = %existing.key, "Segment snapshot replaced");
        Ok(SnapshotWrite::Replaced)
    }
}
