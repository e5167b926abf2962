// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Human-readable departure time, e.g. `9:05 AM`.
pub fn format_trip_time(hour: u8, minute: u8) -> String {
    let (display_hour, suffix) = match hour {
        0 => (12, "AM"),
        1..=11 => (hour, "AM"),
        12 => (12, "PM"),
        _ => (hour - 12, "PM"),
    };
    format!("{}:{:02} {}", display_hour, minute, suffix)
}

/// Long date used in emails, e.g. `Friday, December 18, 2026`.
pub fn format_trip_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}
