//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local runs.

use crate::time_utils::DayBoundary;
use std::env;

const DEFAULT_STRAVA_API_URL: &str = "https://www.strava.com/api/v3";
const DEFAULT_STRAVA_OAUTH_URL: &str = "https://www.strava.com/oauth/token";
const DEFAULT_SEGMENTS_FILE: &str = "data/segments.json";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Strava ---
    /// Strava OAuth client ID
    pub strava_client_id: String,
    /// Strava OAuth client secret
    pub strava_client_secret: String,
    /// Long-lived refresh token for the account that reads segments
    pub strava_refresh_token: String,
    /// Access token, if one is already known. Refreshed on demand otherwise.
    pub strava_access_token: Option<String>,
    /// Base URL of the Strava v3 API
    pub strava_api_url: String,
    /// Token endpoint used for refreshes
    pub strava_oauth_url: String,

    // --- Storage ---
    /// GCP project ID hosting Firestore
    pub gcp_project_id: String,

    // --- Job ---
    /// Path to the segment catalog JSON file
    pub segments_file: String,
    /// Keep syncing remaining segments after a per-segment failure
    pub continue_on_error: bool,
    /// Calendar used to decide which day a sample belongs to
    pub day_boundary: DayBoundary,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            strava_client_id: "test_client_id".to_string(),
            strava_client_secret: "test_secret".to_string(),
            strava_refresh_token: "test_refresh_token".to_string(),
            strava_access_token: None,
            strava_api_url: DEFAULT_STRAVA_API_URL.to_string(),
            strava_oauth_url: DEFAULT_STRAVA_OAUTH_URL.to_string(),
            gcp_project_id: "test-project".to_string(),
            segments_file: DEFAULT_SEGMENTS_FILE.to_string(),
            continue_on_error: false,
            day_boundary: DayBoundary::Utc,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            strava_client_id: required("STRAVA_CLIENT_ID")?,
            strava_client_secret: required("STRAVA_CLIENT_SECRET")?,
            strava_refresh_token: required("STRAVA_REFRESH_TOKEN")?,
            strava_access_token: env::var("STRAVA_ACCESS_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            strava_api_url: env::var("STRAVA_API_URL")
                .unwrap_or_else(|_| DEFAULT_STRAVA_API_URL.to_string()),
            strava_oauth_url: env::var("STRAVA_OAUTH_URL")
                .unwrap_or_else(|_| DEFAULT_STRAVA_OAUTH_URL.to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            segments_file: env::var("SEGMENTS_FILE")
                .unwrap_or_else(|_| DEFAULT_SEGMENTS_FILE.to_string()),
            continue_on_error: match env::var("SYNC_CONTINUE_ON_ERROR") {
                Ok(v) => parse_flag(&v)
                    .ok_or(ConfigError::Invalid("SYNC_CONTINUE_ON_ERROR", v.clone()))?,
                Err(_) => false,
            },
            day_boundary: match env::var("FETCH_DATE_TIMEZONE") {
                Ok(v) => v
                    .parse()
                    .map_err(|_| ConfigError::Invalid("FETCH_DATE_TIMEZONE", v.clone()))?,
                Err(_) => DayBoundary::Utc,
            },
        })
    }
}

/// Read a required variable, trimming stray whitespace from secret bindings.
fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
