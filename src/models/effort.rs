// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Effort time-series model: one record per segment, one sample per day.

use crate::time_utils::DayBoundary;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Calendar day a sample was fetched on, stored as `DD-MM-YYYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FetchDate(NaiveDate);

impl FetchDate {
    /// Wire format of the `fetch_date` field.
    pub const FORMAT: &'static str = "%d-%m-%Y";

    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// The calendar day containing `now`, per `boundary`.
    pub fn on(now: DateTime<Utc>, boundary: DayBoundary) -> Self {
        Self(boundary.date_of(now))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

impl fmt::Display for FetchDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

/// Error parsing a [`FetchDate`].
#[derive(Debug, thiserror::Error)]
pub enum FetchDateError {
    #[error("{0}")]
    Parse(#[from] chrono::ParseError),

    /// Parsed, but not written as zero-padded `DD-MM-YYYY`.
    #[error("not in canonical DD-MM-YYYY form")]
    NotCanonical,
}

impl FromStr for FetchDate {
    type Err = FetchDateError;

    /// Only the exact form produced by `Display` is accepted, so string
    /// comparisons on stored dates agree with date comparisons.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = Self(NaiveDate::parse_from_str(s, Self::FORMAT)?);
        if date.to_string() != s {
            return Err(FetchDateError::NotCanonical);
        }
        Ok(date)
    }
}

impl Serialize for FetchDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FetchDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid fetch_date {:?}: {}", raw, e)))
    }
}

/// One `(date, effort_count)` observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortSample {
    /// Absolute effort count reported by Strava on that day
    pub effort_count: u64,
    pub fetch_date: FetchDate,
}

/// Stored effort time series for one segment (`effort_stats` collection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortRecord {
    /// Strava segment ID (identity key)
    pub segment_id: u64,
    /// Segment name at the time the record was created
    pub name: String,
    /// Samples in the order they were first written
    #[serde(default)]
    pub efforts: Vec<EffortSample>,
}

impl EffortRecord {
    /// A fresh record holding a single sample.
    pub fn new(segment_id: u64, name: impl Into<String>, sample: EffortSample) -> Self {
        Self {
            segment_id,
            name: name.into(),
            efforts: vec![sample],
        }
    }

    /// Index of the sample fetched on `date`, if any.
    pub fn position_of(&self, date: FetchDate) -> Option<usize> {
        self.efforts.iter().position(|e| e.fetch_date == date)
    }

    /// Sample fetched on `date`, if any.
    pub fn sample_on(&self, date: FetchDate) -> Option<&EffortSample> {
        self.position_of(date).map(|i| &self.efforts[i])
    }

    /// Most recently written sample.
    pub fn latest(&self) -> Option<&EffortSample> {
        self.efforts.last()
    }
}

/// The single write needed to bring a record up to date with a new sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplePlan {
    /// No record yet: insert this one.
    Create(EffortRecord),
    /// Record exists without a sample for the day: push this sample.
    Append(EffortSample),
    /// Record already has a sample for the day at `index`: replace its count
    /// with the one in `sample`.
    Overwrite { index: usize, sample: EffortSample },
}

/// Decide how `sample` merges into the existing record.
///
/// At most one sample per `fetch_date`; a second sample on the same day
/// replaces the count in place and keeps its position.
pub fn plan_sample(
    existing: Option<&EffortRecord>,
    segment_id: u64,
    name: &str,
    sample: EffortSample,
) -> SamplePlan {
    let Some(record) = existing else {
        return SamplePlan::Create(EffortRecord::new(segment_id, name, sample));
    };

    match record.position_of(sample.fetch_date) {
        Some(index) => SamplePlan::Overwrite { index, sample },
        None => SamplePlan::Append(sample),
    }
}
