// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip model shared by both travel directions.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Which way a trip travels. Trips and subscriptions in each direction live
/// in separate collections but share one schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub enum Direction {
    /// Campus to airport
    #[serde(rename = "fromCampus")]
    FromCampus,
    /// Airport to campus
    #[serde(rename = "fromAirport")]
    FromAirport,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::FromCampus, Direction::FromAirport];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::FromCampus => "fromCampus",
            Direction::FromAirport => "fromAirport",
        }
    }

    /// Where a trip in this direction starts.
    pub fn origin<'a>(self, trip: &'a Trip) -> &'a str {
        match self {
            Direction::FromCampus => &trip.college,
            Direction::FromAirport => &trip.airport,
        }
    }

    /// Where a trip in this direction ends.
    pub fn destination<'a>(self, trip: &'a Trip) -> &'a str {
        match self {
            Direction::FromCampus => &trip.airport,
            Direction::FromAirport => &trip.college,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored trip record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct Trip {
    /// Trip ID (also used as document ID)
    pub id: String,
    /// Normalized email of the user who posted the trip
    pub owner_email: String,
    /// Seats offered to other riders
    pub max_other_members: u32,
    /// Riders who joined, in join order
    #[serde(default)]
    pub trip_member_emails: Vec<String>,
    pub trip_date: NaiveDate,
    /// 0-23
    pub trip_hour: u8,
    /// 0, 15, 30 or 45
    pub trip_quarter_hour: u8,
    pub trip_name: String,
    pub college: String,
    pub airport: String,
}

impl Trip {
    /// A trip is full once every offered seat is taken.
    pub fn is_full(&self) -> bool {
        self.trip_member_emails.len() >= self.max_other_members as usize
    }

    pub fn seats_left(&self) -> u32 {
        self.max_other_members
            .saturating_sub(self.trip_member_emails.len() as u32)
    }
}

/// Fields supplied when creating a trip.
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub owner_email: String,
    pub max_other_members: u32,
    pub trip_date: NaiveDate,
    pub trip_hour: u8,
    pub trip_quarter_hour: u8,
    pub trip_name: String,
    pub college: String,
    pub airport: String,
}

impl NewTrip {
    pub fn into_trip(self, id: String) -> Trip {
        Trip {
            id,
            owner_email: self.owner_email,
            max_other_members: self.max_other_members,
            trip_member_emails: Vec::new(),
            trip_date: self.trip_date,
            trip_hour: self.trip_hour,
            trip_quarter_hour: self.trip_quarter_hour,
            trip_name: self.trip_name,
            college: self.college,
            airport: self.airport,
        }
    }
}

/// Exact-match search criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripQuery {
    pub trip_date: NaiveDate,
    pub trip_hour: u8,
    pub college: String,
    pub airport: String,
}

impl TripQuery {
    pub fn matches(&self, trip: &Trip) -> bool {
        trip.trip_date == self.trip_date
            && trip.trip_hour == self.trip_hour
            && trip.college == self.college
            && trip.airport == self.airport
    }
}
