// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Segment-Effort-Tracker sync job
//!
//! Runs once over the segment catalog and exits. Scheduling is left to the
//! caller (cron, Cloud Scheduler, ...).

use segment_effort_tracker::{
    catalog::SegmentCatalog,
    config::Config,
    db::{FirestoreDb, SharedStore},
    error::AppError,
    services::{AreasRepository, FailurePolicy, StravaClient, SyncJob, SyncOrchestrator},
    time_utils::SystemClock,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Initialize structured JSON logging for GCP
    init_logging();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Sync job failed to start");
            ExitCode::from(2)
        }
    }
}

/// Set up dependencies and run the job. Returns whether every segment synced.
async fn run() -> Result<bool, AppError> {
    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        project = %config.gcp_project_id,
        segments_file = %config.segments_file,
        continue_on_error = config.continue_on_error,
        day_boundary = ?config.day_boundary,
        "Starting segment sync"
    );

    let catalog = SegmentCatalog::load_from_file(&config.segments_file)?;

    // Initialize Firestore database
    let store: SharedStore = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);

    // Reference data check is advisory only
    if let Err(e) = AreasRepository::new(store.clone())
        .missing_catalog_areas(&catalog)
        .await
    {
        tracing::warn!(error = %e, "Could not check catalog trail areas");
    }

    let strava = Arc::new(StravaClient::from_config(&config));
    let orchestrator = SyncOrchestrator::new(strava, store, Arc::new(SystemClock))
        .with_day_boundary(config.day_boundary);
    let policy = if config.continue_on_error {
        FailurePolicy::ContinueOnError
    } else {
        FailurePolicy::AbortOnFirstError
    };

    let report = SyncJob::new(orchestrator, policy).run(&catalog).await;
    Ok(report.is_success())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in ["segment_effort_tracker=debug", "info"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry().with(filter).with(format).init();
}
