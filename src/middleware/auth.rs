// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cookie authentication middleware.
//!
//! API routes answer unauthenticated requests with a 401 envelope. Page routes
//! redirect to the login page instead.

use crate::error::AppError;
use crate::services::{AuthToken, Credentials};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

/// Where unauthenticated page requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Authenticated user extracted from the auth cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Normalized email
    pub email: String,
}

/// Read the auth token from the request's cookies.
///
/// Browsers may split cookies across several headers, so all of them are
/// joined before parsing.
pub fn token_from_headers(credentials: &Credentials, headers: &HeaderMap) -> Option<AuthToken> {
    let cookies = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ");

    credentials.parse_cookie(&cookies)
}

/// Resolve the request's auth cookie to a user, if valid.
async fn authenticate(state: &AppState, token: Option<AuthToken>) -> Option<AuthUser> {
    let token = token?;
    if !state.is_token_valid(&token).await {
        tracing::debug!(email = %token.email, "Auth token rejected");
        return None;
    }

    Some(AuthUser { email: token.email })
}

/// Middleware for API routes: 401 envelope when not authenticated.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = token_from_headers(&state.credentials, request.headers());
    match authenticate(&state, token).await {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => AppError::Unauthorized.into_response(),
    }
}

/// Middleware for page routes: redirect to the login page.
pub async fn require_auth_redirect(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = token_from_headers(&state.credentials, request.headers());
    match authenticate(&state, token).await {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => Redirect::to(LOGIN_PATH).into_response(),
    }
}
