// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Static web client.
//!
//! Assets live under `/static`. Every other unmatched path gets the client's
//! `index.html` so the client-side router can take over. `/account` and
//! `/trips` require a session and redirect to the login page without one.

use crate::middleware::require_auth_redirect;
use crate::AppState;
use axum::{middleware, routing::get_service, Router};
use std::path::Path;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};

pub const INDEX_FILE: &str = "index.html";

pub fn routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let client_dir = Path::new(&state.config.client_dir);
    let index = client_dir.join(INDEX_FILE);

    let protected_pages = Router::new()
        .route("/account", get_service(ServeFile::new(&index)))
        .route("/trips", get_service(ServeFile::new(&index)))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth_redirect,
        ));

    Router::new()
        .merge(protected_pages)
        .nest_service("/static", ServeDir::new(client_dir))
        .fallback_service(ServeFile::new(&index))
}
