// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (keyed by normalized email)
//! - Trips (one collection per direction)
//! - Subscriptions (one collection per direction)
//! - Verification records
//!
//! Read-modify-write operations run inside `run_transaction`, so Firestore
//! retries them with fresh data when a concurrent writer wins.

use crate::db::{collections, new_id, StoreError, StoreResult};
use crate::models::user::{member_trips_field, owned_trips_field};
use crate::models::{
    Direction, NewSubscription, NewTrip, NewUser, Subscription, Trip, TripQuery, User,
    VerificationRecord,
};
use chrono::{NaiveDate, Utc};
use futures_util::{stream, StreamExt};
use std::sync::Arc;

const MAX_CONCURRENT_DB_OPS: usize = 50;

fn db_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Result of a conditional write decided inside a transaction.
enum Conditional {
    Applied,
    Missing,
    Full,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: firestore::FirestoreDb,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> StoreResult<Self> {
        // The emulator needs no credentials; skip the ADC lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| db_error(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> StoreResult<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJpZ2V0YmFjayJ9."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| db_error(format!("Failed to connect to Firestore Emulator: {}", e)))?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    /// Apply `modify` to a user document inside a transaction.
    async fn modify_user<F>(&self, email: &str, modify: F) -> StoreResult<()>
    where
        F: Fn(&mut User) + Send + Sync + 'static,
    {
        let email = email.to_string();
        let modify = Arc::new(modify);

        let found = self
            .client
            .run_transaction(move |db, transaction| {
                let email = email.clone();
                let modify = Arc::clone(&modify);
                Box::pin(async move {
                    let user: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&email)
                        .await?;

                    let Some(mut user) = user else {
                        return Ok(false);
                    };
                    modify(&mut user);

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&email)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                })
            })
            .await
            .map_err(db_error)?;

        if found {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = new_user.into_user(Utc::now());
        let candidate = user.clone();

        let created = self
            .client
            .run_transaction(move |db, transaction| {
                let user = candidate.clone();
                Box::pin(async move {
                    let existing: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&user.email)
                        .await?;

                    if existing.is_some() {
                        return Ok(false);
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.email)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                })
            })
            .await
            .map_err(db_error)?;

        if !created {
            return Err(StoreError::UserExists);
        }

        tracing::info!(email = %user.email, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, email: &str) -> StoreResult<Option<User>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(email)
            .await
            .map_err(db_error)
    }

    pub async fn record_login(&self, email: &str) -> StoreResult<()> {
        let now = Utc::now();
        self.modify_user(email, move |user| user.last_login = Some(now))
            .await
    }

    pub async fn verify_user(&self, email: &str) -> StoreResult<()> {
        self.modify_user(email, |user| user.verified = true).await
    }

    pub async fn delete_user(&self, email: &str) -> StoreResult<()> {
        self.client
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(email)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn add_owned_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        owner_email: &str,
    ) -> StoreResult<()> {
        let trip_id = trip_id.to_string();
        self.modify_user(owner_email, move |user| {
            user.owned_trips_mut(direction).push(trip_id.clone())
        })
        .await
    }

    // ─── Trip Operations ─────────────────────────────────────────

    pub async fn create_trip(&self, direction: Direction, new_trip: NewTrip) -> StoreResult<Trip> {
        let trip = new_trip.into_trip(new_id());

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::trips(direction))
            .document_id(&trip.id)
            .object(&trip)
            .execute()
            .await
            .map_err(db_error)?;

        Ok(trip)
    }

    pub async fn get_trip(&self, direction: Direction, trip_id: &str) -> StoreResult<Option<Trip>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::trips(direction))
            .obj()
            .one(trip_id)
            .await
            .map_err(db_error)
    }

    /// Fetch trips concurrently, keeping request order and skipping misses.
    pub async fn find_trips(&self, direction: Direction, ids: &[String]) -> StoreResult<Vec<Trip>> {
        let found = stream::iter(ids.iter().cloned())
            .map(|id| async move { self.get_trip(direction, &id).await })
            .buffered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<StoreResult<Option<Trip>>>>()
            .await
            .into_iter()
            .collect::<StoreResult<Vec<Option<Trip>>>>()?;

        Ok(found.into_iter().flatten().collect())
    }

    pub async fn search_trips(
        &self,
        direction: Direction,
        query: &TripQuery,
    ) -> StoreResult<Vec<Trip>> {
        self.client
            .fluent()
            .select()
            .from(collections::trips(direction))
            .filter(|q| {
                q.for_all([
                    q.field("tripDate").eq(query.trip_date.to_string()),
                    q.field("tripHour").eq(u64::from(query.trip_hour)),
                    q.field("college").eq(query.college.as_str()),
                    q.field("airport").eq(query.airport.as_str()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    pub async fn add_member(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> StoreResult<()> {
        let trip_id = trip_id.to_string();
        let email = email.to_string();

        let outcome = self
            .client
            .run_transaction(move |db, transaction| {
                let trip_id = trip_id.clone();
                let email = email.clone();
                Box::pin(async move {
                    let trip: Option<Trip> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::trips(direction))
                        .obj()
                        .one(&trip_id)
                        .await?;

                    let Some(mut trip) = trip else {
                        return Ok(Conditional::Missing);
                    };
                    if trip.is_full() {
                        return Ok(Conditional::Full);
                    }

                    trip.trip_member_emails.push(email.clone());
                    db.fluent()
                        .update()
                        .in_col(collections::trips(direction))
                        .document_id(&trip_id)
                        .object(&trip)
                        .add_to_transaction(transaction)?;

                    let member: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&email)
                        .await?;

                    if let Some(mut member) = member {
                        member.member_trips_mut(direction).push(trip_id.clone());
                        db.fluent()
                            .update()
                            .in_col(collections::USERS)
                            .document_id(&email)
                            .object(&member)
                            .add_to_transaction(transaction)?;
                    }

                    Ok(Conditional::Applied)
                })
            })
            .await
            .map_err(db_error)?;

        match outcome {
            Conditional::Applied => Ok(()),
            Conditional::Missing => Err(StoreError::NotFound),
            Conditional::Full => Err(StoreError::TripFull),
        }
    }

    pub async fn remove_member(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> StoreResult<()> {
        let trip_id = trip_id.to_string();
        let email = email.to_string();

        let outcome = self
            .client
            .run_transaction(move |db, transaction| {
                let trip_id = trip_id.clone();
                let email = email.clone();
                Box::pin(async move {
                    let trip: Option<Trip> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::trips(direction))
                        .obj()
                        .one(&trip_id)
                        .await?;

                    let Some(mut trip) = trip else {
                        return Ok(Conditional::Missing);
                    };
                    let Some(pos) = trip.trip_member_emails.iter().position(|m| *m == email)
                    else {
                        return Ok(Conditional::Missing);
                    };
                    trip.trip_member_emails.remove(pos);

                    db.fluent()
                        .update()
                        .in_col(collections::trips(direction))
                        .document_id(&trip_id)
                        .object(&trip)
                        .add_to_transaction(transaction)?;

                    let member: Option<User> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USERS)
                        .obj()
                        .one(&email)
                        .await?;

                    if let Some(mut member) = member {
                        let trips = member.member_trips_mut(direction);
                        if let Some(pos) = trips.iter().position(|id| *id == trip_id) {
                            trips.remove(pos);
                        }
                        db.fluent()
                            .update()
                            .in_col(collections::USERS)
                            .document_id(&email)
                            .object(&member)
                            .add_to_transaction(transaction)?;
                    }

                    Ok(Conditional::Applied)
                })
            })
            .await
            .map_err(db_error)?;

        match outcome {
            Conditional::Applied => Ok(()),
            _ => Err(StoreError::NotFound),
        }
    }

    /// Delete the trip and scrub its id from every user that references it.
    pub async fn delete_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        owner_email: &str,
    ) -> StoreResult<()> {
        let trip_id = trip_id.to_string();
        let owner_email = owner_email.to_string();

        let outcome = self
            .client
            .run_transaction(move |db, transaction| {
                let trip_id = trip_id.clone();
                let owner_email = owner_email.clone();
                Box::pin(async move {
                    let trip: Option<Trip> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::trips(direction))
                        .obj()
                        .one(&trip_id)
                        .await?;

                    match trip {
                        Some(trip) if trip.owner_email == owner_email => {}
                        _ => return Ok(Conditional::Missing),
                    }

                    let mut affected: Vec<User> = Vec::new();
                    for field in [owned_trips_field(direction), member_trips_field(direction)] {
                        let users: Vec<User> = db
                            .fluent()
                            .select()
                            .from(collections::USERS)
                            .filter(|q| q.field(field).array_contains(trip_id.as_str()))
                            .obj()
                            .query()
                            .await?;

                        for user in users {
                            if !affected.iter().any(|u| u.email == user.email) {
                                affected.push(user);
                            }
                        }
                    }

                    for mut user in affected {
                        user.forget_trip(direction, &trip_id);
                        db.fluent()
                            .update()
                            .in_col(collections::USERS)
                            .document_id(&user.email)
                            .object(&user)
                            .add_to_transaction(transaction)?;
                    }

                    db.fluent()
                        .delete()
                        .from(collections::trips(direction))
                        .document_id(&trip_id)
                        .add_to_transaction(transaction)?;

                    Ok(Conditional::Applied)
                })
            })
            .await
            .map_err(db_error)?;

        match outcome {
            Conditional::Applied => Ok(()),
            _ => Err(StoreError::NotFound),
        }
    }

    // ─── Subscription Operations ─────────────────────────────────

    pub async fn subscribe(
        &self,
        direction: Direction,
        new_subscription: NewSubscription,
    ) -> StoreResult<Subscription> {
        let subscription = new_subscription.into_subscription(new_id(), direction, Utc::now());

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::subscriptions(direction))
            .document_id(&subscription.id)
            .object(&subscription)
            .execute()
            .await
            .map_err(db_error)?;

        Ok(subscription)
    }

    pub async fn get_subscription(
        &self,
        direction: Direction,
        id: &str,
    ) -> StoreResult<Option<Subscription>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::subscriptions(direction))
            .obj()
            .one(id)
            .await
            .map_err(db_error)
    }

    pub async fn get_subscriptions(
        &self,
        direction: Direction,
        email: &str,
    ) -> StoreResult<Vec<Subscription>> {
        self.client
            .fluent()
            .select()
            .from(collections::subscriptions(direction))
            .filter(|q| q.for_all([q.field("email").eq(email)]))
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    pub async fn unsubscribe(&self, direction: Direction, id: &str) -> StoreResult<()> {
        self.client
            .fluent()
            .delete()
            .from(collections::subscriptions(direction))
            .document_id(id)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }

    pub async fn get_subscribers_matching(
        &self,
        direction: Direction,
        college: &str,
        airport: &str,
        trip_date: NaiveDate,
    ) -> StoreResult<Vec<Subscription>> {
        self.client
            .fluent()
            .select()
            .from(collections::subscriptions(direction))
            .filter(|q| {
                q.for_all([
                    q.field("college").eq(college),
                    q.field("airport").eq(airport),
                    q.field("tripDate").eq(trip_date.to_string()),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(db_error)
    }

    // ─── Verification Records ────────────────────────────────────

    pub async fn create_verification_record(&self, email: &str) -> StoreResult<VerificationRecord> {
        let record = VerificationRecord::new(
            uuid::Uuid::new_v4().to_string(),
            email.to_string(),
            Utc::now(),
        );

        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::VERIFICATION_RECORDS)
            .document_id(&record.id)
            .object(&record)
            .execute()
            .await
            .map_err(db_error)?;

        Ok(record)
    }

    pub async fn get_verification_record(
        &self,
        id: &str,
    ) -> StoreResult<Option<VerificationRecord>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::VERIFICATION_RECORDS)
            .obj()
            .one(id)
            .await
            .map_err(db_error)
    }

    pub async fn delete_verification_record(&self, id: &str) -> StoreResult<()> {
        self.client
            .fluent()
            .delete()
            .from(collections::VERIFICATION_RECORDS)
            .document_id(id)
            .execute()
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
