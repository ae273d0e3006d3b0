// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as ISO 8601 with milliseconds and a `Z` suffix,
/// e.g. `2026-03-01T12:00:00.123Z`.
pub fn format_iso_millis(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current time, formatted by [`format_iso_millis`].
pub fn now_iso() -> String {
    format_iso_millis(Utc::now())
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}
