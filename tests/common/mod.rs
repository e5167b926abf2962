// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use igetback::config::Config;
use igetback::db::{Database, FirestoreStore};
use igetback::routes::create_router;
use igetback::services::{Credentials, DestinationRegistry, Mailer, Outbox};
use igetback::AppState;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct horse battery staple";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> Database {
    let store = FirestoreStore::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator");
    Database::firestore(store)
}

#[allow(dead_code)]
pub fn test_destinations() -> DestinationRegistry {
    DestinationRegistry::from_lines(
        ["BOS", "JFK", "LGA"],
        ["Tufts University", "Boston University", "Columbia University"],
    )
}

/// Create a test app backed by the in-memory store and an outbox mailer.
/// Returns the router, the shared state and the outbox.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> (Router, Arc<AppState>, Outbox) {
    let (mailer, outbox) = Mailer::with_outbox(&config).expect("mailer");
    let credentials = Credentials::new(&config.crypt_pass).expect("credentials");
    let state = Arc::new(AppState::new(
        config,
        Database::in_memory(),
        test_destinations(),
        credentials,
        mailer,
    ));

    (create_router(state.clone()), state, outbox)
}

#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>, Outbox) {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Pull the verification record ID out of a verification email body.
#[allow(dead_code)]
pub fn record_id_from_link(body: &str) -> String {
    let start = body.find("/verify/").expect("verification link") + "/verify/".len();
    body[start..start + 36].to_string()
}

/// Sign up through the API and follow the emailed verification link.
#[allow(dead_code)]
pub async fn register_user(app: &Router, outbox: &Outbox, email: &str) {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/user/create",
            None,
            json!({
                "firstName": "Test",
                "lastName": "Rider",
                "email": email,
                "password": PASSWORD,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), 200, "sign-up failed for {}", email);

    let normalized = email.to_uppercase();
    let mail = outbox
        .messages()
        .await
        .into_iter()
        .rev()
        .find(|m| m.to == normalized)
        .expect("verification email");
    let record_id = record_id_from_link(&mail.body);

    let response = send(app, empty_request("GET", &format!("/verify/{}", record_id), None)).await;
    assert_eq!(response.status(), 303);
}

/// Log in and return a `Cookie` header value carrying the auth token.
#[allow(dead_code)]
pub async fn login(app: &Router, email: &str) -> String {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/user/login",
            None,
            json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), 200, "login failed for {}", email);

    let json = body_json(response).await;
    let token = json["data"]["authToken"].as_str().expect("authToken");
    format!("IgetbackAuth={}", token)
}

#[allow(dead_code)]
pub async fn signed_in_user(app: &Router, outbox: &Outbox, email: &str) -> String {
    register_user(app, outbox, email).await;
    login(app, email).await
}

#[allow(dead_code)]
pub fn trip_body(college: &str, airport: &str, hour: u8, capacity: u32) -> Value {
    json!({
        "maxOtherMembers": capacity,
        "tripDate": "2026-12-18",
        "tripHour": hour,
        "tripQuarterHour": 15,
        "tripName": "Winter break",
        "college": college,
        "airport": airport,
    })
}

/// Create a trip and return its ID.
#[allow(dead_code)]
pub async fn create_trip(app: &Router, cookie: &str, direction: &str, body: Value) -> String {
    let response = send(
        app,
        json_request("POST", &format!("/api/{}/create", direction), Some(cookie), body),
    )
    .await;
    assert_eq!(response.status(), 200);
    let json = body_json(response).await;
    json["data"]["id"].as_str().expect("trip id").to_string()
}

/// Wait for background mail (notifications, alerts) to land in the outbox.
#[allow(dead_code)]
pub async fn wait_for_mail(outbox: &Outbox, count: usize) -> bool {
    for _ in 0..50 {
        if outbox.count().await >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
