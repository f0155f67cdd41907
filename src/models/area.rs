//! Trail area model (read-only reference data in the `areas` collection).

use serde::{Deserialize, Serialize};

/// A rider promoted on an area's page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalRider {
    pub name: String,
    /// Strava athlete ID, kept as entered by editors
    pub strava_id: String,
}

/// A trailhead or meeting point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailBase {
    pub coordinates: Vec<Vec<f64>>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A trail area grouping segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailArea {
    pub name: String,
    /// Short name used in URLs
    pub s_name: String,
    pub description: String,
    #[serde(default)]
    pub local_riders: Vec<LocalRider>,
    #[serde(default)]
    pub instagram: Vec<String>,
    #[serde(default)]
    pub trail_bases: Option<Vec<TrailBase>>,
}
