// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! IGetBack: shared rides between campus and the airport
//!
//! This crate provides the backend API: accounts, trips with seat capacity,
//! trip search and notifications for subscribers.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;
pub mod validation;

use chrono::Utc;
use config::Config;
use db::Database;
use services::{
    credentials::validate_auth_token, AccountService, AuthToken, Credentials,
    DestinationRegistry, Mailer, TripService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub destinations: Arc<DestinationRegistry>,
    pub credentials: Arc<Credentials>,
    pub mailer: Arc<Mailer>,
    pub trips: TripService,
    pub accounts: AccountService,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Database,
        destinations: DestinationRegistry,
        credentials: Credentials,
        mailer: Mailer,
    ) -> Self {
        let destinations = Arc::new(destinations);
        let credentials = Arc::new(credentials);
        let mailer = Arc::new(mailer);

        let trips = TripService::new(
            db.clone(),
            destinations.clone(),
            mailer.clone(),
            config.search_range,
        );
        let accounts = AccountService::new(
            db.clone(),
            credentials.clone(),
            mailer.clone(),
            config.production,
        );

        Self {
            config,
            db,
            destinations,
            credentials,
            mailer,
            trips,
            accounts,
        }
    }

    /// A token is valid within its lifetime and, unless disabled, only while
    /// its user still exists.
    pub async fn is_token_valid(&self, token: &AuthToken) -> bool {
        if !validate_auth_token(token, Utc::now()) {
            return false;
        }
        if !self.config.check_token_user {
            return true;
        }

        match self.db.user_exists(&token.email).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(error = %e, "Could not check token user");
                false
            }
        }
    }
}
