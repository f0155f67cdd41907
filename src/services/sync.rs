// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Segment sync service.
//!
//! Handles the core workflow for one segment:
//! 1. Fetch the segment from Strava
//! 2. Derive today's effort sample and the full snapshot
//! 3. Record the sample in the effort ledger
//! 4. Replace the segment snapshot
//!
//! Step 4 never runs unless step 3 succeeded. There is no compensation when
//! step 4 fails after step 3: the snapshot stays stale until the next run.

use crate::catalog::{SegmentCatalog, TrackedSegment};
use crate::db::SharedStore;
use crate::error::AppError;
use crate::models::{FetchDate, SegmentSnapshot};
use crate::services::ledger::{EffortLedger, LedgerWrite};
use crate::services::snapshot::{SnapshotStore, SnapshotWrite};
use crate::services::strava::SegmentProvider;
use crate::time_utils::{format_utc_rfc3339, unix_timestamp, Clock, DayBoundary};
use std::sync::Arc;

/// Syncs one segment at a time.
pub struct SyncOrchestrator {
    provider: Arc<dyn SegmentProvider>,
    ledger: EffortLedger,
    snapshots: SnapshotStore,
    clock: Arc<dyn Clock>,
    day_boundary: DayBoundary,
}

impl SyncOrchestrator {
    pub fn new(
        provider: Arc<dyn SegmentProvider>,
        store: SharedStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            ledger: EffortLedger::new(store.clone()),
            snapshots: SnapshotStore::new(store),
            clock,
            day_boundary: DayBoundary::default(),
        }
    }

    /// Stamp samples with days taken from `boundary` instead of UTC.
    pub fn with_day_boundary(mut self, boundary: DayBoundary) -> Self {
        self.day_boundary = boundary;
        self
    }

    pub fn ledger(&self) -> &EffortLedger {
        &self.ledger
    }

    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Fetch one segment and persist its effort sample and snapshot.
    pub async fn sync(&self, segment: &TrackedSegment) -> Result<SyncOutcome, AppError> {
        tracing::info!(segment_id = segment.id, trail_area = %segment.trail_area, "Syncing segment");

        // 1. Fetch from Strava
        let raw = self.provider.get_segment(segment.id).await?;
        if raw.id != segment.id {
            return Err(AppError::Malformed(format!(
                "requested segment {} but Strava returned {}",
                segment.id, raw.id
            )));
        }

        // 2. Derive sample and snapshot from a single reading of the clock
        let now = self.clock.now();
        let today = FetchDate::on(now, self.day_boundary);
        let snapshot = SegmentSnapshot::from_raw(
            &raw,
            &segment.trail_area,
            segment.alt_name.as_deref(),
            unix_timestamp(now),
        );

        // 3. Ledger first; a failure here must leave the snapshot untouched
        let ledger = self
            .ledger
            .record_sample(raw.id, &raw.name, raw.effort_count, today)
            .await?;

        // 4. Snapshot
        let snapshot_write = self.snapshots.replace_snapshot(raw.id, &snapshot).await?;

        tracing::info!(
            segment_id = raw.id,
            effort_count = raw.effort_count,
            fetch_date = %today,
            fetched_at = %format_utc_rfc3339(now),
            ledger = ?ledger,
            snapshot = ?snapshot_write,
            "Segment synced"
        );

        Ok(SyncOutcome {
            segment_id: raw.id,
            name: raw.name,
            effort_count: raw.effort_count,
            fetch_date: today,
            ledger,
            snapshot: snapshot_write,
        })
    }
}

/// Result of syncing one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    pub segment_id: u64,
    pub name: String,
    pub effort_count: u64,
    pub fetch_date: FetchDate,
    pub ledger: LedgerWrite,
    pub snapshot: SnapshotWrite,
}

/// What to do when one segment fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first failure.
    #[default]
    AbortOnFirstError,
    /// Record the failure and move on, unless the error affects every
    /// remaining segment (see [`AppError::aborts_run`]).
    ContinueOnError,
}

/// A segment that failed to sync.
#[derive(Debug)]
pub struct SyncFailure {
    pub segment_id: u64,
    pub error: AppError,
}

/// Summary of a run over the catalog.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub synced: Vec<SyncOutcome>,
    pub failures: Vec<SyncFailure>,
    /// Catalog segments never attempted because the run stopped early
    pub skipped: Vec<u64>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty()
    }
}

/// Runs the orchestrator over every catalog segment, sequentially.
pub struct SyncJob {
    orchestrator: SyncOrchestrator,
    policy: FailurePolicy,
}

impl SyncJob {
    pub fn new(orchestrator: SyncOrchestrator, policy: FailurePolicy) -> Self {
        Self {
            orchestrator,
            policy,
        }
    }

    /// Sync each segment in catalog order.
    pub async fn run(&self, catalog: &SegmentCatalog) -> SyncReport {
        let mut report = SyncReport::default();
        let mut segments = catalog.segments();

        for segment in segments.by_ref() {
            match self.orchestrator.sync(&segment).await {
                Ok(outcome) => report.synced.push(outcome),
                Err(error) => {
                    tracing::error!(segment_id = segment.id, error = %error, "Segment sync failed");
                    let stop = self.policy == FailurePolicy::AbortOnFirstError || error.aborts_run();
                    report.failures.push(SyncFailure {
                        segment_id: segment.id,
                        error,
                    });
                    if stop {
                        break;
                    }
                }
            }
        }

        report.skipped = segments.map(|s| s.id).collect();
        if !report.skipped.is_empty() {
            tracing::warn!(count = report.skipped.len(), "Run stopped early; segments skipped");
        }

        tracing::info!(
            synced = report.synced.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            "Sync run finished"
        );
        report
    }
}
