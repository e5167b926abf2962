// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trip and subscription routes, parameterized by direction.
//! The auth middleware is applied in routes/mod.rs for these routes.

use super::{data, parse_direction, Data};
use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{Subscription, Trip};
use crate::validation::{
    is_document_id, GetMultipleRequest, JoinTripRequest, SubscribeRequest, TripCreateRequest,
    TripSearchRequest, ValidatedJson,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/{direction}/create", post(create_trip))
        .route("/api/{direction}/join", post(join_trip))
        .route("/api/{direction}/search", post(search_trips))
        .route("/api/{direction}/getMultiple", post(get_multiple))
        .route("/api/{direction}/{trip_id}", delete(delete_trip))
        .route(
            "/api/user/subscriptions/{direction}",
            get(list_subscriptions).post(subscribe),
        )
        .route(
            "/api/user/subscriptions/{direction}/{subscription_id}",
            delete(unsubscribe),
        )
}

// ─── Trips ───────────────────────────────────────────────────

async fn create_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(direction): Path<String>,
    ValidatedJson(request): ValidatedJson<TripCreateRequest>,
) -> Result<Json<Data<Trip>>> {
    let direction = parse_direction(&direction)?;
    let trip = state
        .trips
        .create_trip(direction, &user.email, request)
        .await?;
    Ok(data(trip))
}

async fn join_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(direction): Path<String>,
    ValidatedJson(request): ValidatedJson<JoinTripRequest>,
) -> Result<()> {
    let direction = parse_direction(&direction)?;
    state
        .trips
        .join_trip(direction, &request.trip_id, &user.email)
        .await
}

async fn delete_trip(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((direction, trip_id)): Path<(String, String)>,
) -> Result<()> {
    let direction = parse_direction(&direction)?;
    if !is_document_id(&trip_id) {
        return Err(AppError::BadRequest("invalid trip id".to_string()));
    }
    state
        .trips
        .delete_trip(direction, &trip_id, &user.email)
        .await
}

async fn search_trips(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(direction): Path<String>,
    ValidatedJson(request): ValidatedJson<TripSearchRequest>,
) -> Result<Json<Data<Vec<Trip>>>> {
    let direction = parse_direction(&direction)?;
    let trips = state
        .trips
        .search_trips(direction, &user.email, request)
        .await?;
    Ok(data(trips))
}

async fn get_multiple(
    State(state): State<Arc<AppState>>,
    Path(direction): Path<String>,
    ValidatedJson(request): ValidatedJson<GetMultipleRequest>,
) -> Result<Json<Data<Vec<Trip>>>> {
    let direction = parse_direction(&direction)?;
    let trips = state.trips.get_trips(direction, &request.trip_ids).await?;
    Ok(data(trips))
}

// ─── Subscriptions ───────────────────────────────────────────

async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(direction): Path<String>,
) -> Result<Json<Data<Vec<Subscription>>>> {
    let direction = parse_direction(&direction)?;
    let subscriptions = state
        .trips
        .list_subscriptions(direction, &user.email)
        .await?;
    Ok(data(subscriptions))
}

async fn subscribe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(direction): Path<String>,
    ValidatedJson(request): ValidatedJson<SubscribeRequest>,
) -> Result<Json<Data<Subscription>>> {
    let direction = parse_direction(&direction)?;
    let subscription = state
        .trips
        .subscribe(direction, &user.email, request)
        .await?;
    Ok(data(subscription))
}

async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((direction, subscription_id)): Path<(String, String)>,
) -> Result<()> {
    let direction = parse_direction(&direction)?;
    if !is_document_id(&subscription_id) {
        return Err(AppError::BadRequest("invalid subscription id".to_string()));
    }
    state
        .trips
        .unsubscribe(direction, &user.email, &subscription_id)
        .await
}
