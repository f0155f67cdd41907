// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client for fetching segment details.
//!
//! Handles:
//! - Segment fetching (`GET /segments/{id}`)
//! - Access token refresh when missing or rejected (one retry)
//! - Rate limit detection (surfaced as `AppError::RateLimited`, never retried)

use crate::config::Config;
use crate::error::AppError;
use crate::models::RawSegment;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;

/// Source of raw segment attributes.
#[async_trait]
pub trait SegmentProvider: Send + Sync {
    /// Fetch the current attributes of one segment.
    async fn get_segment(&self, segment_id: u64) -> Result<RawSegment, AppError>;
}

/// Tokens for the single account the tracker reads with.
struct StravaTokens {
    access_token: Option<String>,
    refresh_token: String,
}

/// Strava API client.
pub struct StravaClient {
    http: reqwest::Client,
    base_url: String,
    oauth_url: String,
    client_id: String,
    client_secret: String,
    tokens: Mutex<StravaTokens>,
}

impl StravaClient {
    /// Create a client from application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.strava_api_url.trim_end_matches('/').to_string(),
            oauth_url: config.strava_oauth_url.clone(),
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
            tokens: Mutex::new(StravaTokens {
                access_token: config.strava_access_token.clone(),
                refresh_token: config.strava_refresh_token.clone(),
            }),
        }
    }

    /// Current access token, refreshing first if none is known.
    async fn access_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.tokens.lock().await.access_token.clone() {
            return Ok(token);
        }
        self.refresh_access_token().await
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Strava may rotate the refresh token; the new one replaces the old
    /// for the rest of the run.
    pub async fn refresh_access_token(&self) -> Result<String, AppError> {
        tracing::info!("Refreshing Strava access token");

        let mut tokens = self.tokens.lock().await;

        let response = self
            .http
            .post(&self.oauth_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", tokens.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::StravaApi(format!("Token refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Strava token refresh failed");
            return Err(AppError::StravaAuth(format!(
                "Token refresh failed with status {}",
                status
            )));
        }

        let refreshed: TokenRefreshResponse = response
            .json()
            .await
            .map_err(|e| AppError::StravaAuth(format!("Failed to parse token response: {}", e)))?;

        tokens.access_token = Some(refreshed.access_token.clone());
        if let Some(refresh_token) = refreshed.refresh_token {
            tokens.refresh_token = refresh_token;
        }

        tracing::info!(expires_at = refreshed.expires_at, "Strava access token refreshed");
        Ok(refreshed.access_token)
    }

    /// GET a JSON resource, retrying once with a fresh token on 401.
    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, AppError> {
        let access_token = self.access_token().await?;
        let response = self.send_get(url, &access_token).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            tracing::info!("Strava rejected access token (401)");
            let access_token = self.refresh_access_token().await?;
            self.send_get(url, &access_token).await?
        } else {
            response
        };

        self.check_response_json(response).await
    }

    async fn send_get(&self, url: &str, access_token: &str) -> Result<reqwest::Response, AppError> {
        self.http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::StravaApi(e.to_string()))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::StravaApi(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl SegmentProvider for StravaClient {
    async fn get_segment(&self, segment_id: u64) -> Result<RawSegment, AppError> {
        tracing::debug!(segment_id, "Fetching segment from Strava");
        let url = format!("{}/segments/{}", self.base_url, segment_id);
        let body: serde_json::Value = self.get_json(&url).await?;
        RawSegment::from_json(body)
            .map_err(|e| AppError::Malformed(format!("Strava segment {}: {}", segment_id, e)))
    }
}

/// Map a non-success Strava response to an error.
fn classify_failure(status: StatusCode, body: &str) -> AppError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!("Strava rate limit hit (429)");
            AppError::RateLimited
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::StravaAuth(format!("HTTP {}: {}", status, body))
        }
        _ => {
            tracing::error!(status = %status, body = %body, "Error fetching data from Strava");
            AppError::StravaApi(format!("HTTP {}: {}", status, body))
        }
    }
}

/// Token refresh response from Strava.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: i64,
}
