// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Segment catalog: the fixed list of segments the job tracks.
//!
//! Loaded from a JSON file grouping Strava segment IDs by trail area:
//!
//! ```json
//! {"areas": [{"trail_area": "Montseny", "segments": [{"id": 11451094}]}]}
//! ```
//!
//! Segments are synced in file order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use validator::{Validate, ValidationError};

/// One tracked segment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Validate)]
pub struct CatalogSegment {
    /// Strava segment ID
    #[validate(range(min = 1))]
    pub id: u64,
    /// Display name used instead of the Strava name on first insert
    #[serde(default)]
    #[validate(length(min = 1))]
    pub alt_name: Option<String>,
}

/// Segments listed under one trail area.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CatalogArea {
    #[validate(length(min = 1))]
    pub trail_area: String,
    #[validate(nested)]
    pub segments: Vec<CatalogSegment>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
struct CatalogFile {
    #[validate(nested, custom(function = "validate_unique_ids"))]
    areas: Vec<CatalogArea>,
}

/// A segment together with the area it is listed under.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSegment {
    pub id: u64,
    pub trail_area: String,
    pub alt_name: Option<String>,
}

/// The validated catalog.
#[derive(Debug, Clone, Default)]
pub struct SegmentCatalog {
    areas: Vec<CatalogArea>,
}

impl SegmentCatalog {
    /// Load the catalog from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| CatalogError::Io(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load the catalog from a JSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json_data).map_err(|e| CatalogError::Parse(e.to_string()))?;
        file.validate()
            .map_err(|e| CatalogError::Invalid(e.to_string()))?;

        let catalog = Self { areas: file.areas };
        tracing::info!(
            areas = catalog.areas.len(),
            segments = catalog.len(),
            "Loaded segment catalog"
        );
        Ok(catalog)
    }

    pub fn areas(&self) -> &[CatalogArea] {
        &self.areas
    }

    /// Number of tracked segments.
    pub fn len(&self) -> usize {
        self.areas.iter().map(|a| a.segments.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All tracked segments in sync order.
    pub fn segments(&self) -> impl Iterator<Item = TrackedSegment> + '_ {
        self.areas.iter().flat_map(|area| {
            area.segments.iter().map(move |segment| TrackedSegment {
                id: segment.id,
                trail_area: area.trail_area.clone(),
                alt_name: segment.alt_name.clone(),
            })
        })
    }
}

fn validate_unique_ids(areas: &[CatalogArea]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for segment in areas.iter().flat_map(|a| &a.segments) {
        if !seen.insert(segment.id) {
            let mut err = ValidationError::new("duplicate_segment");
            err.add_param("id".into(), &segment.id);
            return Err(err);
        }
    }
    Ok(())
}

/// Errors from catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read file: {0}")]
    Io(String),

    #[error("Failed to parse catalog: {0}")]
    Parse(String),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}
