// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: sign-up, verification, login, logout and deletion.

use axum::http::{header, StatusCode};
use igetback::config::Config;
use igetback::db::Database;
use igetback::models::Direction;
use igetback::routes::create_router;
use igetback::services::{Credentials, Mailer};
use igetback::AppState;
use serde_json::json;
use std::sync::Arc;

mod common;
use common::{
    body_json, create_test_app, create_test_app_with, create_trip, empty_request, json_request,
    login, record_id_from_link, register_user, send, signed_in_user, test_destinations, trip_body,
    PASSWORD,
};

fn sign_up_body(email: &str) -> serde_json::Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": email,
        "password": PASSWORD,
    })
}

#[tokio::test]
async fn test_sign_up_sends_verification_link() {
    let (app, state, outbox) = create_test_app();

    let response = send(
        &app,
        json_request("POST", "/api/user/create", None, sign_up_body("Ada@Tufts.edu")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["emailSendSuccess"], true);
    assert_eq!(json["data"]["newUser"]["email"], "ADA@TUFTS.EDU");
    assert_eq!(json["data"]["newUser"]["verified"], false);

    let sent = outbox.messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "ADA@TUFTS.EDU");
    let record_id = record_id_from_link(&sent[0].body);

    // Not verified yet: login refused
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/user/login",
            None,
            json!({ "email": "ada@tufts.edu", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "user not verified");

    let uri = format!("/verify/{}", record_id);
    let response = send(&app, empty_request("GET", &uri, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/login");

    let user = state.db.get_user("ADA@TUFTS.EDU").await.unwrap().unwrap();
    assert!(user.verified);

    // The link is single use
    let response = send(&app, empty_request("GET", &uri, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_verify_rejects_garbage_ids() {
    let (app, _state, _outbox) = create_test_app();

    let response = send(&app, empty_request("GET", "/verify/not-a-uuid", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        empty_request(
            "GET",
            "/verify/7d444840-9dc0-11d1-b245-5ffdce74fad2",
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sign_up_auto_verifies_without_mail_in_development() {
    let config = Config::test_default();
    let mailer = Mailer::from_config(&config).unwrap();
    let credentials = Credentials::new(&config.crypt_pass).unwrap();
    let state = Arc::new(AppState::new(
        config,
        Database::in_memory(),
        test_destinations(),
        credentials,
        mailer,
    ));
    let app = create_router(state.clone());

    let response = send(
        &app,
        json_request("POST", "/api/user/create", None, sign_up_body("ada@tufts.edu")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["emailSendSuccess"], false);
    assert_eq!(json["data"]["newUser"]["verified"], true);

    // Can log in straight away
    login(&app, "ada@tufts.edu").await;
}

#[tokio::test]
async fn test_sign_up_fails_without_mail_in_production() {
    let config = Config {
        production: true,
        ..Config::test_default()
    };
    let mailer = Mailer::from_config(&config).unwrap();
    let credentials = Credentials::new(&config.crypt_pass).unwrap();
    let state = Arc::new(AppState::new(
        config,
        Database::in_memory(),
        test_destinations(),
        credentials,
        mailer,
    ));
    let app = create_router(state);

    let response = send(
        &app,
        json_request("POST", "/api/user/create", None, sign_up_body("ada@tufts.edu")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "could not send email");
}

#[tokio::test]
async fn test_duplicate_email_is_case_insensitive() {
    let (app, _state, outbox) = create_test_app();
    register_user(&app, &outbox, "ada@tufts.edu").await;

    let response = send(
        &app,
        json_request("POST", "/api/user/create", None, sign_up_body("ADA@tufts.EDU")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "email exists");
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let (app, _state, outbox) = create_test_app();
    register_user(&app, &outbox, "ada@tufts.edu").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/user/login",
            None,
            json!({ "email": "ADA@TUFTS.EDU", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.starts_with("IgetbackAuth="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    assert!(set_cookie.contains("Max-Age=3600"));
    // Plain HTTP works outside production
    assert!(!set_cookie.contains("Secure"));

    let json = body_json(response).await;
    assert!(json["data"]["user"]["lastLogin"].is_string());
    assert_eq!(json["data"]["user"]["email"], "ADA@TUFTS.EDU");
    assert!(set_cookie.contains(json["data"]["authToken"].as_str().unwrap()));
}

#[tokio::test]
async fn test_production_cookie_is_secure() {
    let config = Config {
        production: true,
        ..Config::test_default()
    };
    let (app, _state, outbox) = create_test_app_with(config);
    register_user(&app, &outbox, "ada@tufts.edu").await;

    let response = send(
        &app,
        json_request(
            "POST",
            "/api/user/login",
            None,
            json!({ "email": "ada@tufts.edu", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(set_cookie.to_str().unwrap().contains("Secure"));
}

#[tokio::test]
async fn test_wrong_password_unauthorized() {
    let (app, _state, outbox) = create_test_app();
    register_user(&app, &outbox, "ada@tufts.edu").await;

    for (email, password) in [
        ("ada@tufts.edu", "wrong password"),
        ("nobody@tufts.edu", PASSWORD),
    ] {
        let response = send(
            &app,
            json_request(
                "POST",
                "/api/user/login",
                None,
                json!({ "email": email, "password": password }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _state, _outbox) = create_test_app();

    let response = send(&app, empty_request("POST", "/api/user/logout", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("IgetbackAuth=;"));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_delete_account_cascades() {
    let (app, state, outbox) = create_test_app();
    let owner = signed_in_user(&app, &outbox, "owner@tufts.edu").await;
    let rider = signed_in_user(&app, &outbox, "rider@tufts.edu").await;

    let owned = create_trip(
        &app,
        &owner,
        "fromCampus",
        trip_body("Tufts University", "BOS", 9, 3),
    )
    .await;
    let joined = create_trip(
        &app,
        &rider,
        "fromAirport",
        trip_body("Tufts University", "BOS", 20, 3),
    )
    .await;

    // Rider joins the owner's trip, owner joins the rider's trip
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/fromCampus/join",
            Some(&rider),
            json!({ "tripId": owned }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(
        &app,
        json_request(
            "POST",
            "/api/fromAirport/join",
            Some(&owner),
            json!({ "tripId": joined }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, empty_request("DELETE", "/api/user/delete", Some(&owner))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(set_cookie.to_str().unwrap().contains("Max-Age=0"));

    assert!(state.db.get_user("OWNER@TUFTS.EDU").await.unwrap().is_none());
    // Owned trip is gone, and the rider no longer references it
    assert!(state
        .db
        .get_trip(Direction::FromCampus, &owned)
        .await
        .unwrap()
        .is_none());
    let rider_user = state.db.get_user("RIDER@TUFTS.EDU").await.unwrap().unwrap();
    assert!(rider_user.member_trips_from_campus.is_empty());

    // Joined trip survives without the deleted member
    let trip = state
        .db
        .get_trip(Direction::FromAirport, &joined)
        .await
        .unwrap()
        .unwrap();
    assert!(trip.trip_member_emails.is_empty());

    // The old cookie no longer works
    let response = send(&app, empty_request("GET", "/api/user/account", Some(&owner))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
