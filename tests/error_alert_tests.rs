// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Production error alerts.
//!
//! A request that ends in a 500 is reported by email to `LOG_ADDR` in
//! production. Clients only ever see a generic message.

use axum::http::StatusCode;
use chrono::Utc;
use igetback::config::Config;

mod common;
use common::{body_json, create_test_app_with, json_request, send, trip_body, wait_for_mail};

/// Token for a user that was never stored. With the user check disabled it
/// authenticates, but recording the trip on the owner then fails.
fn ghost_cookie(state: &igetback::AppState) -> String {
    let token = state
        .credentials
        .build_auth_token("GHOST@TUFTS.EDU", Utc::now())
        .unwrap();
    format!("IgetbackAuth={}", token)
}

#[tokio::test]
async fn test_server_error_alert_in_production() {
    let config = Config {
        production: true,
        check_token_user: false,
        ..Config::test_default()
    };
    let (app, state, outbox) = create_test_app_with(config);
    let cookie = ghost_cookie(&state);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/fromCampus/create",
            Some(&cookie),
            trip_body("Tufts University", "BOS", 9, 2),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "internal server error");

    assert!(wait_for_mail(&outbox, 1).await, "no alert sent");
    let sent = outbox.messages().await;
    assert_eq!(sent[0].to, "alerts@igetback.test");
    assert_eq!(sent[0].subject, "IGetBack server error");
    assert!(sent[0].body.contains("POST /api/fromCampus/create"));
}

#[tokio::test]
async fn test_no_alert_outside_production() {
    let config = Config {
        check_token_user: false,
        ..Config::test_default()
    };
    let (app, state, outbox) = create_test_app_with(config);
    let cookie = ghost_cookie(&state);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/fromCampus/create",
            Some(&cookie),
            trip_body("Tufts University", "BOS", 9, 2),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(outbox.count().await, 0);
}

#[tokio::test]
async fn test_client_errors_do_not_alert() {
    let config = Config {
        production: true,
        check_token_user: false,
        ..Config::test_default()
    };
    let (app, state, outbox) = create_test_app_with(config);
    let cookie = ghost_cookie(&state);

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/fromCampus/create",
            Some(&cookie),
            trip_body("Hogwarts", "BOS", 9, 2),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(outbox.count().await, 0);
}
