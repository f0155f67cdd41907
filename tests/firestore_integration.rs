// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Run with FIRESTORE_EMULATOR_HOST pointing at a local emulator.
//!
//! Segment IDs are unique per test so runs against a shared emulator do not
//! interfere.

mod common;
use common::{raw_segment, test_db, unique_segment_id, utc_noon, StubProvider};

use segment_effort_tracker::catalog::TrackedSegment;
use segment_effort_tracker::db::{collections, DocumentStore, Filter, SharedStore, Update};
use segment_effort_tracker::models::{FetchDate, SegmentSnapshot};
use segment_effort_tracker::services::{EffortLedger, LedgerWrite, SnapshotStore, SyncOrchestrator};
use segment_effort_tracker::time_utils::FixedClock;
use std::sync::Arc;

fn date(s: &str) -> FetchDate {
    s.parse().unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// EFFORT LEDGER
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_ledger_series_round_trip() {
    require_emulator!();

    let store: SharedStore = Arc::new(test_db().await);
    let ledger = EffortLedger::new(store);
    let segment_id = unique_segment_id();

    assert!(ledger.get_record(segment_id).await.unwrap().is_none());

    let writes = [
        ledger.record_sample(segment_id, "Ridge Trail", 10, date("01-01-2030")).await.unwrap(),
        ledger.record_sample(segment_id, "Ridge Trail", 25, date("01-01-2030")).await.unwrap(),
        ledger.record_sample(segment_id, "Ridge Trail", 12, date("02-01-2030")).await.unwrap(),
    ];
    assert_eq!(
        writes,
        [LedgerWrite::Created, LedgerWrite::Overwritten, LedgerWrite::Appended]
    );

    let record = ledger.get_record(segment_id).await.unwrap().unwrap();
    let series: Vec<(u64, String)> = record
        .efforts
        .iter()
        .map(|e| (e.effort_count, e.fetch_date.to_string()))
        .collect();
    assert_eq!(
        series,
        vec![(25, "01-01-2030".to_string()), (12, "02-01-2030".to_string())]
    );
}

#[tokio::test]
async fn test_element_guard_rejects_missing_day() {
    require_emulator!();

    let db = test_db().await;
    let ledger = EffortLedger::new(Arc::new(db.clone()));
    let segment_id = unique_segment_id();
    ledger
        .record_sample(segment_id, "Guarded", 1, date("01-01-2030"))
        .await
        .unwrap();

    let filter = Filter::field_eq("segment_id", segment_id).and_element_eq(
        "efforts",
        "fetch_date",
        "05-01-2030",
    );
    let result = db
        .update_one(
            collections::EFFORTS,
            &filter,
            &Update::set("name", "changed"),
            false,
        )
        .await
        .unwrap();
    assert_eq!(result.matched, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// SNAPSHOTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_snapshot_replace_keeps_single_document() {
    require_emulator!();

    let db = test_db().await;
    let snapshots = SnapshotStore::new(Arc::new(db.clone()));
    let segment_id = unique_segment_id();
    let raw = raw_segment(segment_id, "Ridge Trail", 7);

    let first = SegmentSnapshot::from_raw(&raw, "Montseny", None, 1.0);
    snapshots.replace_snapshot(segment_id, &first).await.unwrap();

    let mut second = first.clone();
    second.effort_count = 9;
    second.timestamp = 2.0;
    snapshots.replace_snapshot(segment_id, &second).await.unwrap();

    let docs = db
        .find_many(collections::SEGMENTS, &Filter::field_eq("id", segment_id))
        .await
        .unwrap();
    assert_eq!(docs.len(), 1);

    let stored = snapshots.get_snapshot(segment_id).await.unwrap().unwrap();
    assert_eq!(stored.effort_count, 9);
    assert_eq!(stored.timestamp, 2.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// END TO END
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_sync_against_emulator() {
    require_emulator!();

    let segment_id = unique_segment_id();
    let provider = Arc::new(StubProvider::new().with_segment(raw_segment(segment_id, "Ridge Trail", 7)));
    let clock = Arc::new(FixedClock::new(utc_noon(2030, 1, 1)));
    let orchestrator =
        SyncOrchestrator::new(provider.clone(), Arc::new(test_db().await), clock.clone());
    let tracked = TrackedSegment {
        id: segment_id,
        trail_area: "Montseny".to_string(),
        alt_name: None,
    };

    orchestrator.sync(&tracked).await.unwrap();
    orchestrator.sync(&tracked).await.unwrap();
    clock.advance_days(1);
    provider.set_effort_count(segment_id, 9);
    orchestrator.sync(&tracked).await.unwrap();

    let record = orchestrator.ledger().get_record(segment_id).await.unwrap().unwrap();
    let counts: Vec<u64> = record.efforts.iter().map(|e| e.effort_count).collect();
    assert_eq!(counts, vec![7, 9]);

    let snapshot = orchestrator.snapshots().get_snapshot(segment_id).await.unwrap().unwrap();
    assert_eq!(snapshot.effort_count, 9);
}
