// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava segment payload and the stored segment snapshot.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Strava sends coordinates as `[lat, lng]`, or `[]` when unknown.
fn deserialize_latlng<'de, D>(deserializer: D) -> Result<Option<LatLng>, D::Error>
where
    D: Deserializer<'de>,
{
    let coords: Option<Vec<f64>> = Option::deserialize(deserializer)?;
    match coords.as_deref() {
        None | Some([]) => Ok(None),
        Some([lat, lng]) => Ok(Some(LatLng {
            lat: *lat,
            lng: *lng,
        })),
        Some(other) => Err(serde::de::Error::invalid_length(
            other.len(),
            &"a [lat, lng] pair",
        )),
    }
}

/// Segment map data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMap {
    pub id: String,
    pub polyline: String,
    pub resource_state: u8,
}

/// Link to the leaderboard attached to the KOM/QOM block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub href: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

/// Fastest times on the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Xoms {
    pub kom: Option<String>,
    #[serde(default)]
    pub qom: Option<String>,
    #[serde(default)]
    pub overall: Option<String>,
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// The athlete with the most efforts over the last 90 days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalLegend {
    pub athlete_id: u64,
    pub title: String,
    pub profile: String,
    pub effort_description: String,
    /// Strava reports this as a display string ("42"), not a number
    pub effort_count: String,
    /// Per-gender counts; a missing gender is stored as null
    #[serde(default)]
    pub effort_counts: Option<BTreeMap<String, Option<String>>>,
    pub destination: String,
}

/// Authenticated athlete's own stats on the segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteSegmentStats {
    pub pr_elapsed_time: Option<f64>,
    pub pr_date: Option<String>,
    #[serde(default)]
    pub pr_visibility: Option<String>,
    #[serde(default)]
    pub pr_activity_id: Option<u64>,
    #[serde(default)]
    pub pr_activity_visibility: Option<String>,
    pub effort_count: u64,
}

/// Detailed segment as returned by `GET /segments/{id}`.
///
/// Only fields the tracker stores are required; everything else Strava
/// adds is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawSegment {
    pub id: u64,
    pub name: String,
    pub distance: f64,
    pub average_grade: f64,
    #[serde(default, deserialize_with = "deserialize_latlng")]
    pub start_latlng: Option<LatLng>,
    #[serde(default, deserialize_with = "deserialize_latlng")]
    pub end_latlng: Option<LatLng>,
    pub effort_count: u64,
    pub athlete_count: u64,
    pub star_count: u64,
    pub map: SegmentMap,

    #[serde(default)]
    pub resource_state: Option<u8>,
    #[serde(default)]
    pub activity_type: Option<String>,
    #[serde(default)]
    pub maximum_grade: Option<f64>,
    #[serde(default)]
    pub elevation_high: Option<f64>,
    #[serde(default)]
    pub elevation_low: Option<f64>,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
    #[serde(default)]
    pub climb_category: Option<u8>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub hazardous: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub xoms: Option<Xoms>,
    #[serde(default)]
    pub local_legend: Option<LocalLegend>,
    #[serde(default)]
    pub athlete_segment_stats: Option<AthleteSegmentStats>,
}

impl RawSegment {
    /// Parse a provider response body, rejecting payloads missing required fields.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn kom(&self) -> Option<&str> {
        self.xoms.as_ref().and_then(|x| x.kom.as_deref())
    }
}

/// Fields owned by editors once a snapshot exists; syncs only set them on insert.
pub const CURATED_FIELDS: &[&str] = &["alt_name", "trail_area", "difficulty", "popularity"];

/// Stored segment snapshot (`segments` collection), keyed by the logical `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    /// Strava segment ID (lookup key, distinct from the storage key)
    pub id: u64,
    pub name: String,
    /// Display name, initially the Strava name
    pub alt_name: String,
    /// Trail area the segment is listed under
    pub trail_area: String,
    pub average_grade: f64,
    /// Distance in meters
    pub distance: f64,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub popularity: u32,
    pub start_lat: Option<f64>,
    pub start_lng: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub local_legend: Option<LocalLegend>,
    pub star_count: u64,
    pub effort_count: u64,
    pub athlete_count: u64,
    pub kom: Option<String>,
    pub map: SegmentMap,
    pub polyline: Option<String>,
    /// Unix time (seconds) of the fetch
    pub timestamp: f64,
}

impl SegmentSnapshot {
    /// Build the snapshot for a freshly fetched segment.
    pub fn from_raw(
        segment: &RawSegment,
        trail_area: &str,
        alt_name: Option<&str>,
        timestamp: f64,
    ) -> Self {
        Self {
            id: segment.id,
            name: segment.name.clone(),
            alt_name: alt_name.unwrap_or(&segment.name).to_string(),
            trail_area: trail_area.to_string(),
            average_grade: segment.average_grade,
            distance: segment.distance,
            difficulty: String::new(),
            popularity: 0,
            start_lat: segment.start_latlng.map(|c| c.lat),
            start_lng: segment.start_latlng.map(|c| c.lng),
            end_lat: segment.end_latlng.map(|c| c.lat),
            end_lng: segment.end_latlng.map(|c| c.lng),
            local_legend: segment.local_legend.clone(),
            star_count: segment.star_count,
            effort_count: segment.effort_count,
            athlete_count: segment.athlete_count,
            kom: segment.kom().map(str::to_string),
            map: segment.map.clone(),
            polyline: Some(segment.map.polyline.clone()),
            timestamp,
        }
    }
}
