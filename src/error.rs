// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared by the sync engine, the Strava client and
//! the document-store drivers.

use crate::catalog::CatalogError;
use crate::config::ConfigError;

/// Application error type.
///
/// The sync engine never recovers from any of these locally; every variant
/// is surfaced to the caller of `SyncOrchestrator::sync` unchanged.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Segment catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Store unreachable or misconfigured at startup. Fatal for the whole run.
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Strava answered 429. Callers decide whether to stop or back off.
    #[error("Strava API rate limit exceeded")]
    RateLimited,

    #[error("Strava authentication failed: {0}")]
    StravaAuth(String),

    #[error("Strava API error: {0}")]
    StravaApi(String),

    #[error("Database error: {0}")]
    Database(String),

    /// A stored document or provider payload did not match its typed record.
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// An update matched no document (it changed between read and write).
    #[error("Write conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether this error is the provider's rate-limit signal.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::RateLimited)
    }

    /// Whether this error is an authentication/token problem with Strava.
    pub fn is_strava_token_error(&self) -> bool {
        matches!(self, AppError::StravaAuth(_))
    }

    /// Errors after which syncing further segments is pointless.
    ///
    /// Rate limits and auth failures hit every remaining fetch the same way;
    /// connection loss hits every remaining write.
    pub fn aborts_run(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited | AppError::StravaAuth(_) | AppError::Connection(_)
        )
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;
