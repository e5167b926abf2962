// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Subscription ("notify me") and email verification records.

use super::Direction;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A standing request to hear about future trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct Subscription {
    /// Subscription ID (also used as document ID)
    pub id: String,
    /// Subscriber's normalized email
    pub email: String,
    pub airport: String,
    pub college: String,
    pub trip_date: NaiveDate,
    pub trip_hour: u8,
    pub trip_quarter_hour: u8,
    pub date_created: DateTime<Utc>,
    pub direction: Direction,
}

impl Subscription {
    /// Hour distance check used after the coarse database filter.
    pub fn within_hours(&self, hour: u8, range: u32) -> bool {
        (i32::from(self.trip_hour) - i32::from(hour)).unsigned_abs() <= range
    }
}

#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub email: String,
    pub airport: String,
    pub college: String,
    pub trip_date: NaiveDate,
    pub trip_hour: u8,
    pub trip_quarter_hour: u8,
}

impl NewSubscription {
    pub fn into_subscription(
        self,
        id: String,
        direction: Direction,
        now: DateTime<Utc>,
    ) -> Subscription {
        Subscription {
            id,
            email: self.email,
            airport: self.airport,
            college: self.college,
            trip_date: self.trip_date,
            trip_hour: self.trip_hour,
            trip_quarter_hour: self.trip_quarter_hour,
            date_created: now,
            direction,
        }
    }
}

/// How long a verification link stays usable.
pub const VERIFICATION_TTL_HOURS: i64 = 24;

/// Single-use record linking a verification link to an email.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// Random UUID v4 (also used as document ID)
    pub id: String,
    pub email: String,
    pub date_created: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn new(id: String, email: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email,
            date_created: now,
            expires_at: now + Duration::hours(VERIFICATION_TTL_HOURS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
