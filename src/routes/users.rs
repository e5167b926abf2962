// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: sign-up, verification, login/logout, profile and deletion.

use super::{data, Data};
use crate::error::Result;
use crate::middleware::auth::{AuthUser, LOGIN_PATH};
use crate::models::UserProfile;
use crate::services::accounts::{Login, SignUp};
use crate::services::credentials::{AUTH_COOKIE, TOKEN_LIFETIME_HOURS};
use crate::validation::{UserCreateRequest, UserLoginRequest, ValidatedJson};
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::Redirect,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

/// Routes reachable without a session.
pub fn public_routes(verify_endpoint: &str) -> Router<Arc<AppState>> {
    let verify_path = format!("/{}/{{record_id}}", verify_endpoint.trim_matches('/'));

    Router::new()
        .route("/api/user/create", post(create_user))
        .route("/api/user/login", post(login))
        .route("/api/user/logout", post(logout))
        .route(&verify_path, get(verify))
}

/// Routes that require a session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/user/account", get(account))
        .route("/api/user/delete", delete(delete_account))
}

/// Session cookie. `Secure` is only set in production so local HTTP works.
fn auth_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(TOKEN_LIFETIME_HOURS))
        .build()
}

/// Removal must repeat the creation attributes or browsers keep the cookie.
fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<UserCreateRequest>,
) -> Result<Json<Data<SignUp>>> {
    let sign_up = state.accounts.sign_up(request).await?;
    Ok(data(sign_up))
}

async fn verify(
    State(state): State<Arc<AppState>>,
    Path(record_id): Path<String>,
) -> Result<Redirect> {
    state.accounts.verify(&record_id).await?;
    Ok(Redirect::to(LOGIN_PATH))
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidatedJson(request): ValidatedJson<UserLoginRequest>,
) -> Result<(CookieJar, Json<Data<Login>>)> {
    let login = state.accounts.login(request).await?;
    let jar = jar.add(auth_cookie(
        login.auth_token.clone(),
        state.config.production,
    ));
    Ok((jar, data(login)))
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> CookieJar {
    jar.add(removal_cookie(state.config.production))
}

async fn account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Data<UserProfile>>> {
    let profile = state.accounts.account(&user.email).await?;
    Ok(data(profile))
}

async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<CookieJar> {
    state.accounts.delete_account(&user.email).await?;
    Ok(jar.add(removal_cookie(state.config.production)))
}
