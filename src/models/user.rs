//! User model for storage and API.

use super::Direction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Canonical form of an email address. Lookups are case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_uppercase()
}

/// User record stored in the database (keyed by normalized email).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    /// Normalized (uppercased) email, also the document ID
    pub email: String,
    /// HMAC-SHA512 of the password keyed by the email (hex)
    pub password_hash: String,
    pub date_created: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub verified: bool,
    #[serde(default)]
    pub owned_trips_from_campus: Vec<String>,
    #[serde(default)]
    pub owned_trips_from_airport: Vec<String>,
    #[serde(default)]
    pub member_trips_from_campus: Vec<String>,
    #[serde(default)]
    pub member_trips_from_airport: Vec<String>,
}

impl User {
    pub fn owned_trips(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::FromCampus => &self.owned_trips_from_campus,
            Direction::FromAirport => &self.owned_trips_from_airport,
        }
    }

    pub fn owned_trips_mut(&mut self, direction: Direction) -> &mut Vec<String> {
        match direction {
            Direction::FromCampus => &mut self.owned_trips_from_campus,
            Direction::FromAirport => &mut self.owned_trips_from_airport,
        }
    }

    pub fn member_trips(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::FromCampus => &self.member_trips_from_campus,
            Direction::FromAirport => &self.member_trips_from_airport,
        }
    }

    pub fn member_trips_mut(&mut self, direction: Direction) -> &mut Vec<String> {
        match direction {
            Direction::FromCampus => &mut self.member_trips_from_campus,
            Direction::FromAirport => &mut self.member_trips_from_airport,
        }
    }

    /// Drop every reference to a trip. Returns true if anything changed.
    pub fn forget_trip(&mut self, direction: Direction, trip_id: &str) -> bool {
        let owned = self.owned_trips_mut(direction);
        let before = owned.len();
        owned.retain(|id| id != trip_id);
        let mut changed = owned.len() != before;

        let member = self.member_trips_mut(direction);
        let before = member.len();
        member.retain(|id| id != trip_id);
        changed |= member.len() != before;

        changed
    }
}

/// Stored field names of the trip lists, for database queries.
pub fn owned_trips_field(direction: Direction) -> &'static str {
    match direction {
        Direction::FromCampus => "ownedTripsFromCampus",
        Direction::FromAirport => "ownedTripsFromAirport",
    }
}

pub fn member_trips_field(direction: Direction) -> &'static str {
    match direction {
        Direction::FromCampus => "memberTripsFromCampus",
        Direction::FromAirport => "memberTripsFromAirport",
    }
}

/// Fields supplied when creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            password_hash: self.password_hash,
            date_created: now,
            last_login: None,
            verified: false,
            owned_trips_from_campus: Vec::new(),
            owned_trips_from_airport: Vec::new(),
            member_trips_from_campus: Vec::new(),
            member_trips_from_airport: Vec::new(),
        }
    }
}

/// User as returned by the API (no password hash).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "client/src/generated/")
)]
pub struct UserProfile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_created: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub verified: bool,
    pub owned_trips_from_campus: Vec<String>,
    pub owned_trips_from_airport: Vec<String>,
    pub member_trips_from_campus: Vec<String>,
    pub member_trips_from_airport: Vec<String>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            date_created: user.date_created,
            last_login: user.last_login,
            verified: user.verified,
            owned_trips_from_campus: user.owned_trips_from_campus,
            owned_trips_from_airport: user.owned_trips_from_airport,
            member_trips_from_campus: user.member_trips_from_campus,
            member_trips_from_airport: user.member_trips_from_airport,
        }
    }
}
