// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store used for tests and when no GCP project is configured.
//!
//! Each collection is a `DashMap`. Holding an entry guard serializes writers
//! on that document, which makes the capacity check in `add_member` atomic.

use crate::db::{new_id, StoreError, StoreResult};
use crate::models::{
    Direction, NewSubscription, NewTrip, NewUser, Subscription, Trip, TripQuery, User,
    VerificationRecord,
};
use chrono::{NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

type DocKey = (Direction, String);

#[derive(Default)]
struct Collections {
    users: DashMap<String, User>,
    trips: DashMap<DocKey, Trip>,
    subscriptions: DashMap<DocKey, Subscription>,
    verification_records: DashMap<String, VerificationRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Collections>,
}

fn key(direction: Direction, id: &str) -> DocKey {
    (direction, id.to_string())
}

impl MemoryStore {
    fn modify_user(&self, email: &str, modify: impl FnOnce(&mut User)) -> StoreResult<()> {
        let mut user = self
            .inner
            .users
            .get_mut(email)
            .ok_or(StoreError::NotFound)?;
        modify(&mut user);
        Ok(())
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        match self.inner.users.entry(new_user.email.clone()) {
            Entry::Occupied(_) => Err(StoreError::UserExists),
            Entry::Vacant(slot) => {
                let user = new_user.into_user(Utc::now());
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    pub async fn get_user(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.inner.users.get(email).map(|u| u.clone()))
    }

    pub async fn record_login(&self, email: &str) -> StoreResult<()> {
        self.modify_user(email, |user| user.last_login = Some(Utc::now()))
    }

    pub async fn verify_user(&self, email: &str) -> StoreResult<()> {
        self.modify_user(email, |user| user.verified = true)
    }

    pub async fn delete_user(&self, email: &str) -> StoreResult<()> {
        self.inner.users.remove(email);
        Ok(())
    }

    pub async fn add_owned_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        owner_email: &str,
    ) -> StoreResult<()> {
        self.modify_user(owner_email, |user| {
            user.owned_trips_mut(direction).push(trip_id.to_string())
        })
    }

    // ─── Trips ───────────────────────────────────────────────────

    pub async fn create_trip(&self, direction: Direction, new_trip: NewTrip) -> StoreResult<Trip> {
        let trip = new_trip.into_trip(new_id());
        self.inner
            .trips
            .insert(key(direction, &trip.id), trip.clone());
        Ok(trip)
    }

    pub async fn get_trip(&self, direction: Direction, trip_id: &str) -> StoreResult<Option<Trip>> {
        Ok(self
            .inner
            .trips
            .get(&key(direction, trip_id))
            .map(|t| t.clone()))
    }

    pub async fn find_trips(&self, direction: Direction, ids: &[String]) -> StoreResult<Vec<Trip>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.inner.trips.get(&key(direction, id)).map(|t| t.clone()))
            .collect())
    }

    pub async fn search_trips(
        &self,
        direction: Direction,
        query: &TripQuery,
    ) -> StoreResult<Vec<Trip>> {
        Ok(self
            .inner
            .trips
            .iter()
            .filter(|entry| entry.key().0 == direction && query.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    pub async fn add_member(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> StoreResult<()> {
        // Lock order is always trip then user.
        let mut trip = self
            .inner
            .trips
            .get_mut(&key(direction, trip_id))
            .ok_or(StoreError::NotFound)?;

        if trip.is_full() {
            return Err(StoreError::TripFull);
        }
        trip.trip_member_emails.push(email.to_string());

        if let Some(mut member) = self.inner.users.get_mut(email) {
            member.member_trips_mut(direction).push(trip_id.to_string());
        }
        Ok(())
    }

    pub async fn remove_member(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> StoreResult<()> {
        let mut trip = self
            .inner
            .trips
            .get_mut(&key(direction, trip_id))
            .ok_or(StoreError::NotFound)?;

        let pos = trip
            .trip_member_emails
            .iter()
            .position(|m| m == email)
            .ok_or(StoreError::NotFound)?;
        trip.trip_member_emails.remove(pos);

        if let Some(mut member) = self.inner.users.get_mut(email) {
            let trips = member.member_trips_mut(direction);
            if let Some(pos) = trips.iter().position(|id| id == trip_id) {
                trips.remove(pos);
            }
        }
        Ok(())
    }

    pub async fn delete_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        owner_email: &str,
    ) -> StoreResult<()> {
        self.inner
            .trips
            .remove_if(&key(direction, trip_id), |_, trip| {
                trip.owner_email == owner_email
            })
            .ok_or(StoreError::NotFound)?;

        for mut user in self.inner.users.iter_mut() {
            user.forget_trip(direction, trip_id);
        }
        Ok(())
    }

    // ─── Subscriptions ───────────────────────────────────────────

    pub async fn subscribe(
        &self,
        direction: Direction,
        new_subscription: NewSubscription,
    ) -> StoreResult<Subscription> {
        let subscription = new_subscription.into_subscription(new_id(), direction, Utc::now());
        self.inner
            .subscriptions
            .insert(key(direction, &subscription.id), subscription.clone());
        Ok(subscription)
    }

    pub async fn get_subscription(
        &self,
        direction: Direction,
        id: &str,
    ) -> StoreResult<Option<Subscription>> {
        Ok(self
            .inner
            .subscriptions
            .get(&key(direction, id))
            .map(|s| s.clone()))
    }

    pub async fn get_subscriptions(
        &self,
        direction: Direction,
        email: &str,
    ) -> StoreResult<Vec<Subscription>> {
        Ok(self.collect_subscriptions(direction, |s| s.email == email))
    }

    pub async fn unsubscribe(&self, direction: Direction, id: &str) -> StoreResult<()> {
        self.inner.subscriptions.remove(&key(direction, id));
        Ok(())
    }

    pub async fn get_subscribers_matching(
        &self,
        direction: Direction,
        college: &str,
        airport: &str,
        trip_date: NaiveDate,
    ) -> StoreResult<Vec<Subscription>> {
        Ok(self.collect_subscriptions(direction, |s| {
            s.college == college && s.airport == airport && s.trip_date == trip_date
        }))
    }

    fn collect_subscriptions(
        &self,
        direction: Direction,
        predicate: impl Fn(&Subscription) -> bool,
    ) -> Vec<Subscription> {
        let mut found: Vec<Subscription> = self
            .inner
            .subscriptions
            .iter()
            .filter(|entry| entry.key().0 == direction && predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        found.sort_by(|a, b| a.date_created.cmp(&b.date_created));
        found
    }

    // ─── Verification records ────────────────────────────────────

    pub async fn create_verification_record(&self, email: &str) -> StoreResult<VerificationRecord> {
        let record = VerificationRecord::new(
            uuid::Uuid::new_v4().to_string(),
            email.to_string(),
            Utc::now(),
        );
        self.inner
            .verification_records
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    pub async fn get_verification_record(
        &self,
        id: &str,
    ) -> StoreResult<Option<VerificationRecord>> {
        Ok(self
            .inner
            .verification_records
            .get(id)
            .map(|r| r.clone()))
    }

    pub async fn delete_verification_record(&self, id: &str) -> StoreResult<()> {
        self.inner.verification_records.remove(id);
        Ok(())
    }
}
