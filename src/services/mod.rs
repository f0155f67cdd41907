// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod areas;
pub mod ledger;
pub mod snapshot;
pub mod strava;
pub mod sync;

pub use areas::AreasRepository;
pub use ledger::{EffortLedger, LedgerWrite};
pub use snapshot::{SnapshotStore, SnapshotWrite};
pub use strava::{SegmentProvider, StravaClient};
pub use sync::{FailurePolicy, SyncFailure, SyncJob, SyncOrchestrator, SyncOutcome, SyncReport};
