// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod area;
pub mod effort;
pub mod segment;

pub use area::TrailArea;
pub use effort::{plan_sample, EffortRecord, EffortSample, FetchDate, SamplePlan};
pub use segment::{RawSegment, SegmentSnapshot};
