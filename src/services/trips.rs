// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip lifecycle: create, join, delete, search and subscriptions.
//!
//! Capacity and ownership rules are enforced by the store; this layer checks
//! destinations, maps store outcomes to API errors and fans out subscriber
//! notifications.

use crate::db::{Database, StoreError};
use crate::error::AppError;
use crate::models::{Direction, NewSubscription, NewTrip, Subscription, Trip, TripQuery};
use crate::services::{DestinationRegistry, Mailer};
use crate::validation::{SubscribeRequest, TripCreateRequest, TripSearchRequest};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct TripService {
    db: Database,
    destinations: Arc<DestinationRegistry>,
    mailer: Arc<Mailer>,
    /// Hour window for subscriber matching
    search_range: u32,
}

impl TripService {
    pub fn new(
        db: Database,
        destinations: Arc<DestinationRegistry>,
        mailer: Arc<Mailer>,
        search_range: u32,
    ) -> Self {
        Self {
            db,
            destinations,
            mailer,
            search_range,
        }
    }

    fn check_destinations(&self, college: &str, airport: &str) -> Result<(), AppError> {
        if !self.destinations.has_college(college) {
            return Err(AppError::BadRequest(format!("unknown college: {}", college)));
        }
        if !self.destinations.has_airport(airport) {
            return Err(AppError::BadRequest(format!("unknown airport: {}", airport)));
        }
        Ok(())
    }

    /// Create a trip owned by `owner_email` and notify matching subscribers
    /// in the background.
    pub async fn create_trip(
        &self,
        direction: Direction,
        owner_email: &str,
        request: TripCreateRequest,
    ) -> Result<Trip, AppError> {
        self.check_destinations(&request.college, &request.airport)?;

        let trip = self
            .db
            .create_trip(
                direction,
                NewTrip {
                    owner_email: owner_email.to_string(),
                    max_other_members: request.max_other_members,
                    trip_date: request.trip_date,
                    trip_hour: request.trip_hour,
                    trip_quarter_hour: request.trip_quarter_hour,
                    trip_name: request.trip_name,
                    college: request.college,
                    airport: request.airport,
                },
            )
            .await?;

        // The trip stays searchable if this fails; only the owner's list misses it.
        if let Err(e) = self
            .db
            .add_owned_trip(direction, &trip.id, owner_email)
            .await
        {
            tracing::error!(
                trip_id = %trip.id,
                owner = owner_email,
                %direction,
                error = %e,
                "Trip created but not recorded on owner"
            );
            return Err(AppError::Internal(anyhow::anyhow!(
                "problem saving trip to user: {}",
                e
            )));
        }

        tracing::info!(trip_id = %trip.id, %direction, "Trip created");

        let service = self.clone();
        let created = trip.clone();
        tokio::spawn(async move {
            if let Err(e) = service.notify_subscribers(direction, &created).await {
                tracing::warn!(trip_id = %created.id, error = %e, "Subscriber notification failed");
            }
        });

        Ok(trip)
    }

    /// Email every subscriber within the hour window, once each, excluding
    /// the trip owner. Returns the recipients in first-seen order.
    pub async fn notify_subscribers(
        &self,
        direction: Direction,
        trip: &Trip,
    ) -> Result<Vec<String>, AppError> {
        let query = TripQuery {
            trip_date: trip.trip_date,
            trip_hour: trip.trip_hour,
            college: trip.college.clone(),
            airport: trip.airport.clone(),
        };

        let subscriptions = self
            .db
            .get_subscribers_in_range(direction, &query, self.search_range)
            .await?;

        let recipients = notification_recipients(&subscriptions, &trip.owner_email);
        if recipients.is_empty() {
            tracing::debug!(trip_id = %trip.id, "No subscribers to notify");
            return Ok(recipients);
        }

        if let Err(e) = self
            .mailer
            .send_subscriber_notification(&recipients, direction, trip)
            .await
        {
            tracing::warn!(trip_id = %trip.id, error = %e, "Some notifications were not delivered");
        }

        Ok(recipients)
    }

    pub async fn join_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> Result<(), AppError> {
        match self.db.add_member(direction, trip_id, email).await {
            Ok(()) => {
                tracing::info!(trip_id, email, %direction, "Joined trip");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AppError::NotFound("unknown trip".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Only the owner may delete; anyone else sees an unknown trip.
    pub async fn delete_trip(
        &self,
        direction: Direction,
        trip_id: &str,
        email: &str,
    ) -> Result<(), AppError> {
        match self.db.delete_trip(direction, trip_id, email).await {
            Ok(()) => {
                tracing::info!(trip_id, %direction, "Trip deleted");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AppError::NotFound("unknown trip".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Exact-match search, hiding the requester's own trips.
    pub async fn search_trips(
        &self,
        direction: Direction,
        email: &str,
        request: TripSearchRequest,
    ) -> Result<Vec<Trip>, AppError> {
        self.check_destinations(&request.college, &request.airport)?;

        let query = TripQuery {
            trip_date: request.trip_date,
            trip_hour: request.trip_hour,
            college: request.college,
            airport: request.airport,
        };

        let mut trips = self.db.search_trips(direction, &query).await?;
        trips.retain(|t| t.owner_email != email);
        Ok(trips)
    }

    pub async fn get_trips(&self, direction: Direction, ids: &[String]) -> Result<Vec<Trip>, AppError> {
        Ok(self.db.find_trips(direction, ids).await?)
    }

    // ─── Subscriptions ───────────────────────────────────────────

    pub async fn subscribe(
        &self,
        direction: Direction,
        email: &str,
        request: SubscribeRequest,
    ) -> Result<Subscription, AppError> {
        let subscription = self
            .db
            .subscribe(
                direction,
                NewSubscription {
                    email: email.to_string(),
                    airport: request.airport,
                    college: request.college,
                    trip_date: request.trip_date,
                    trip_hour: request.trip_hour,
                    trip_quarter_hour: request.trip_quarter_hour,
                },
            )
            .await?;

        tracing::info!(subscription_id = %subscription.id, %direction, "Subscribed");
        Ok(subscription)
    }

    pub async fn list_subscriptions(
        &self,
        direction: Direction,
        email: &str,
    ) -> Result<Vec<Subscription>, AppError> {
        Ok(self.db.get_subscriptions(direction, email).await?)
    }

    /// Remove one of the requester's own subscriptions.
    pub async fn unsubscribe(
        &self,
        direction: Direction,
        email: &str,
        subscription_id: &str,
    ) -> Result<(), AppError> {
        match self.db.get_subscription(direction, subscription_id).await? {
            Some(sub) if sub.email == email => {}
            _ => return Err(AppError::NotFound("unknown subscription".to_string())),
        }

        self.db.unsubscribe(direction, subscription_id).await?;
        tracing::info!(subscription_id, %direction, "Unsubscribed");
        Ok(())
    }
}

/// Distinct subscriber emails in first-seen order, minus the trip owner.
pub fn notification_recipients(subscriptions: &[Subscription], owner_email: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    subscriptions
        .iter()
        .map(|s| s.email.as_str())
        .filter(|email| *email != owner_email && seen.insert(*email))
        .map(str::to_string)
        .collect()
}
