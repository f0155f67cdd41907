// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time handling.

use chrono::{DateTime, Duration, Local, NaiveDate, SecondsFormat, Utc};
use std::str::FromStr;
use std::sync::Mutex;

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Unix timestamp in (fractional) seconds, as stored on segment snapshots.
pub fn unix_timestamp(date: DateTime<Utc>) -> f64 {
    date.timestamp_millis() as f64 / 1000.0
}

/// Which calendar a "day" is taken from when stamping samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundary {
    /// Days start at midnight UTC.
    #[default]
    Utc,
    /// Days start at midnight in the host's local timezone (`TZ`).
    Local,
}

impl DayBoundary {
    /// Calendar day containing `now`.
    pub fn date_of(&self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            DayBoundary::Utc => now.date_naive(),
            DayBoundary::Local => now.with_timezone(&Local).date_naive(),
        }
    }
}

impl FromStr for DayBoundary {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" | "" => Ok(DayBoundary::Utc),
            "local" => Ok(DayBoundary::Local),
            other => Err(format!("unknown day boundary {:?}", other)),
        }
    }
}

/// Source of "now" for the sync engine.
///
/// Injected so a run's notion of "today" can be pinned in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
