//! Database layer.
//!
//! [`Database`] is the handle the services use. It dispatches to Firestore in
//! production and to an in-process store for tests and offline development.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::models::{
    Direction, NewSubscription, NewTrip, NewUser, Subscription, Trip, TripQuery, User,
    VerificationRecord,
};
use chrono::NaiveDate;

/// Collection names as constants.
pub mod collections {
    use crate::models::Direction;

    pub const USERS: &str = "users";
    pub const VERIFICATION_RECORDS: &str = "userVerificationRecord";

    pub fn trips(direction: Direction) -> &'static str {
        match direction {
            Direction::FromCampus => "fromCampus",
            Direction::FromAirport => "fromAirport",
        }
    }

    pub fn subscriptions(direction: Direction) -> &'static str {
        match direction {
            Direction::FromCampus => "fromCampusSubscription",
            Direction::FromAirport => "fromAirportSubscription",
        }
    }
}

/// Outcome codes of store operations that can fail for business reasons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("user already exists")]
    UserExists,

    #[error("not found")]
    NotFound,

    #[error("trip full")]
    TripFull,

    #[error("database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// New opaque document ID.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Clone)]
enum Backend {
    Firestore(FirestoreStore),
    Memory(MemoryStore),
}

/// Shared database handle (cheap to clone).
#[derive(Clone)]
pub struct Database {
    backend: Backend,
}

macro_rules! dispatch {
    ($self:ident, $store:ident => $call:expr) => {
        match &$self.backend {
            Backend::Firestore($store) => $call.await,
            Backend::Memory($store) => $call.await,
        }
    };
}

impl Database {
    /// Connect to Firestore when a project is configured, else run in memory.
    pub async fn connect(gcp_project_id: Option<&str>) -> StoreResult<Self> {
        match gcp_project_id {
            Some(project_id) => Ok(Self::firestore(FirestoreStore::new(project_id).await?)),
            None => {
                tracing::warn!("No GCP project configured, using in-memory store");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn firestore(store: FirestoreStore) -> Self {
        Self {
            backend: Backend::Firestore(store),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryStore::default()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Firestore(_) => "firestore",
            Backend::Memory(_) => "memory",
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Create a user. Fails with `UserExists` if the email is taken.
    pub async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        dispatch!(self, s => s.create_user(user))
    }

    pub async fn get_user(&self, email: &str) -> StoreResult<Option<User>> {
        dispatch!(self, s => s.get_user(email))
    }

    pub async fn user_exists(&self, email: &str) -> StoreResult<bool> {
        Ok(self.get_user(email).await?.is_some())
    }

    pub async fn record_login(&self, email: &str) -> StoreResult<()> {
        dispatch!(self, s => s.record_login(email))
    }

    pub async fn verify_user(&self, email: &str) -> StoreResult<()> {
        dispatch!(self, s => s.verify_user(email))
    }

    pub async fn delete_user(&self, email: &str) -> StoreResult<()> {
        dispatch!(self, s => s.delete_user(email))
    }

    /// Append a freshly created trip to its owner's owned list.
    ///
    /// `NotFound` here means the trip was created under an email with no
    /// user record.
    pub async fn add_owned_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        owner_email: &str,
    ) -> StoreResult<()> {
        dispatch!(self, s => s.add_owned_trip(direction, trip_id, owner_email))
    }

    // ─── Trip Operations ─────────────────────────────────────────

    /// Persist a new trip with an empty member list.
    pub async fn create_trip(&self, direction: Direction, trip: NewTrip) -> StoreResult<Trip> {
        dispatch!(self, s => s.create_trip(direction, trip))
    }

    pub async fn get_trip(&self, direction: Direction, trip_id: &str) -> StoreResult<Option<Trip>> {
        dispatch!(self, s => s.get_trip(direction, trip_id))
    }

    /// Batch lookup. Unknown ids are skipped.
    pub async fn find_trips(&self, direction: Direction, ids: &[String]) -> StoreResult<Vec<Trip>> {
        dispatch!(self, s => s.find_trips(direction, ids))
    }

    /// Exact match on date, hour, college and airport.
    pub async fn search_trips(
        &self,
        direction: Direction,
        query: &TripQuery,
    ) -> StoreResult<Vec<Trip>> {
        dispatch!(self, s => s.search_trips(direction, query))
    }

    /// Atomically append `email` to the trip's members if a seat is free,
    /// and record the trip in the joiner's member list.
    pub async fn add_member(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> StoreResult<()> {
        dispatch!(self, s => s.add_member(direction, trip_id, email))
    }

    /// Undo one `add_member` for `email`.
    pub async fn remove_member(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> StoreResult<()> {
        dispatch!(self, s => s.remove_member(direction, trip_id, email))
    }

    /// Delete a trip owned by `owner_email` and scrub its id from every user.
    pub async fn delete_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        owner_email: &str,
    ) -> StoreResult<()> {
        dispatch!(self, s => s.delete_trip(direction, trip_id, owner_email))
    }

    // ─── Subscription Operations ─────────────────────────────────

    pub async fn subscribe(
        &self,
        direction: Direction,
        subscription: NewSubscription,
    ) -> StoreResult<Subscription> {
        dispatch!(self, s => s.subscribe(direction, subscription))
    }

    pub async fn get_subscription(
        &self,
        direction: Direction,
        id: &str,
    ) -> StoreResult<Option<Subscription>> {
        dispatch!(self, s => s.get_subscription(direction, id))
    }

    pub async fn get_subscriptions(
        &self,
        direction: Direction,
        email: &str,
    ) -> StoreResult<Vec<Subscription>> {
        dispatch!(self, s => s.get_subscriptions(direction, email))
    }

    pub async fn unsubscribe(&self, direction: Direction, id: &str) -> StoreResult<()> {
        dispatch!(self, s => s.unsubscribe(direction, id))
    }

    /// Subscriptions matching college, airport and date exactly.
    pub async fn get_subscribers_matching(
        &self,
        direction: Direction,
        college: &str,
        airport: &str,
        trip_date: NaiveDate,
    ) -> StoreResult<Vec<Subscription>> {
        dispatch!(self, s => s.get_subscribers_matching(direction, college, airport, trip_date))
    }

    /// Subscriptions whose hour lies within `hour_range` of the query hour.
    ///
    /// The store filters on the exact-match fields; the symmetric hour window
    /// is applied here.
    pub async fn get_subscribers_in_range(
        &self,
        direction: Direction,
        query: &TripQuery,
        hour_range: u32,
    ) -> StoreResult<Vec<Subscription>> {
        let candidates = self
            .get_subscribers_matching(direction, &query.college, &query.airport, query.trip_date)
            .await?;

        Ok(candidates
            .into_iter()
            .filter(|s| s.within_hours(query.trip_hour, hour_range))
            .collect())
    }

    // ─── Verification Records ────────────────────────────────────

    pub async fn create_verification_record(&self, email: &str) -> StoreResult<VerificationRecord> {
        dispatch!(self, s => s.create_verification_record(email))
    }

    pub async fn get_verification_record(
        &self,
        id: &str,
    ) -> StoreResult<Option<VerificationRecord>> {
        dispatch!(self, s => s.get_verification_record(id))
    }

    pub async fn delete_verification_record(&self, id: &str) -> StoreResult<()> {
        dispatch!(self, s => s.delete_verification_record(id))
    }
}
