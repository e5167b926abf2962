// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Emails operators when a request ends in an internal server error.
//!
//! Only installed in production. The error details travel on the response as
//! a [`ServerFault`] extension and never reach the client body.

use crate::error::ServerFault;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub async fn alert_on_server_error(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let Some(details) = response
        .extensions()
        .get::<ServerFault>()
        .map(|fault| fault.0.clone())
    else {
        return response;
    };
    let Some(to) = state.config.log_addr.clone() else {
        tracing::warn!("LOG_ADDR not set, server error alert skipped");
        return response;
    };

    let report = format!(
        "{} {} at {}\n\n{}",
        method,
        path,
        format_utc_rfc3339(chrono::Utc::now()),
        details
    );
    let mailer = state.mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send_error_alert(&to, &report).await {
            tracing::error!(error = %e, "Failed to send server error alert");
        }
    });

    response
}
