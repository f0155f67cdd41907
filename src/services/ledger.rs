// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Effort ledger: the append-only, day-deduplicated effort time series.
//!
//! Each call loads the segment's record, decides with [`plan_sample`] which
//! single write brings it up to date, and performs exactly that write:
//! - no record: insert one holding the new sample
//! - no sample for today: push the sample onto `efforts`
//! - a sample for today: set `effort_count` on today's element

use crate::db::{collections, to_fields, Filter, SharedStore, Update};
use crate::error::AppError;
use crate::models::{plan_sample, EffortRecord, EffortSample, FetchDate, SamplePlan};

/// Which write the ledger performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerWrite {
    /// First sample for the segment; a new record was inserted.
    Created,
    /// First sample for the day; appended to the series.
    Appended,
    /// Same-day rerun; today's count was replaced in place.
    Overwritten,
}

/// Owns the `effort_stats` collection.
#[derive(Clone)]
pub struct EffortLedger {
    store: SharedStore,
}

impl EffortLedger {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Load the effort record for a segment.
    pub async fn get_record(&self, segment_id: u64) -> Result<Option<EffortRecord>, AppError> {
        self.store
            .find_one(collections::EFFORTS, &Filter::field_eq("segment_id", segment_id))
            .await?
            .map(|doc| doc.parse::<EffortRecord>())
            .transpose()
    }

    /// Record today's effort count for a segment.
    ///
    /// Performs one storage write. Storage errors are returned unchanged.
    pub async fn record_sample(
        &self,
        segment_id: u64,
        name: &str,
        effort_count: u64,
        today: FetchDate,
    ) -> Result<LedgerWrite, AppError> {
        let existing = self.get_record(segment_id).await?;
        let sample = EffortSample {
            effort_count,
            fetch_date: today,
        };

        let written = match plan_sample(existing.as_ref(), segment_id, name, sample) {
            SamplePlan::Create(record) => {
                self.store
                    .insert_one(collections::EFFORTS, to_fields(&record)?)
                    .await?;
                LedgerWrite::Created
            }
            SamplePlan::Append(sample) => {
                let filter = Filter::field_eq("segment_id", segment_id);
                let update = Update::push("efforts", to_json(&sample)?);
                let result = self
                    .store
                    .update_one(collections::EFFORTS, &filter, &update, false)
                    .await?;
                if result.matched == 0 {
                    return Err(AppError::Conflict(format!(
                        "effort record for segment {} disappeared before append",
                        segment_id
                    )));
                }
                LedgerWrite::Appended
            }
            SamplePlan::Overwrite { index, sample } => {
                // Target today's element only; samples for other days are
                // never rewritten from this read.
                let filter = Filter::field_eq("segment_id", segment_id).and_element_eq(
                    "efforts",
                    "fetch_date",
                    today.to_string(),
                );
                let update = Update::set_element(
                    "efforts",
                    "fetch_date",
                    today.to_string(),
                    "effort_count",
                    sample.effort_count,
                );
                let result = self
                    .store
                    .update_one(collections::EFFORTS, &filter, &update, false)
                    .await?;
                if result.matched == 0 {
                    return Err(AppError::Conflict(format!(
                        "effort sample {} for segment {} changed before overwrite",
                        today, segment_id
                    )));
                }
                tracing::debug!(segment_id, index, "Replaced same-day effort sample");
                LedgerWrite::Overwritten
            }
        };

        tracing::debug!(
            segment_id,
            effort_count,
            fetch_date = %today,
            write = ?written,
            "Effort sample recorded"
        );
        Ok(written)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, AppError> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("serialize effort sample: {}", e)))
}
