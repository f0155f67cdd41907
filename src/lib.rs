// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Segment-Effort-Tracker: daily effort counts for tracked Strava segments
//!
//! This crate fetches each catalog segment from Strava once per run, appends
//! the day's effort count to a per-segment time series, and keeps one current
//! snapshot document per segment.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod time_utils;
