// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account lifecycle: sign-up, email verification, login and deletion.

use crate::db::{Database, StoreError};
use crate::error::AppError;
use crate::models::{normalize_email, Direction, NewUser, UserProfile};
use crate::services::{Credentials, Mailer};
use crate::validation::{UserCreateRequest, UserLoginRequest};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Result of a sign-up.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUp {
    pub new_user: UserProfile,
    pub email_send_success: bool,
}

/// Result of a successful login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    pub auth_token: String,
    pub user: UserProfile,
}

#[derive(Clone)]
pub struct AccountService {
    db: Database,
    credentials: Arc<Credentials>,
    mailer: Arc<Mailer>,
    /// Production refuses sign-ups whose verification mail cannot be sent
    production: bool,
}

impl AccountService {
    pub fn new(
        db: Database,
        credentials: Arc<Credentials>,
        mailer: Arc<Mailer>,
        production: bool,
    ) -> Self {
        Self {
            db,
            credentials,
            mailer,
            production,
        }
    }

    pub async fn sign_up(&self, request: UserCreateRequest) -> Result<SignUp, AppError> {
        let email = normalize_email(&request.email);
        let password_hash = self
            .credentials
            .hash_password(&email, &request.password)
            .map_err(|e| AppError::Internal(e.into()))?;

        let mut user = self
            .db
            .create_user(NewUser {
                first_name: request.first_name,
                last_name: request.last_name,
                email: email.clone(),
                password_hash,
            })
            .await?;

        let record = self.db.create_verification_record(&email).await?;
        let email_send_success = self
            .mailer
            .send_verification(&user.first_name, &email, &record.id)
            .await;

        if !email_send_success {
            if self.production {
                return Err(AppError::BadRequest("could not send email".to_string()));
            }

            tracing::info!(email = %email, "Verifying user automatically");
            self.db.verify_user(&email).await?;
            self.db.delete_verification_record(&record.id).await?;
            user.verified = true;
        }

        Ok(SignUp {
            new_user: user.into(),
            email_send_success,
        })
    }

    /// Consume a verification record and mark its user verified.
    pub async fn verify(&self, record_id: &str) -> Result<(), AppError> {
        if uuid::Uuid::parse_str(record_id).is_err() {
            return Err(AppError::BadRequest("invalid verification link".to_string()));
        }

        let record = self
            .db
            .get_verification_record(record_id)
            .await?
            .ok_or_else(|| AppError::BadRequest("unknown verification link".to_string()))?;

        if record.is_expired(Utc::now()) {
            self.db.delete_verification_record(record_id).await?;
            return Err(AppError::BadRequest("verification link expired".to_string()));
        }

        match self.db.verify_user(&record.email).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                self.db.delete_verification_record(record_id).await?;
                return Err(AppError::BadRequest("unknown verification link".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        self.db.delete_verification_record(record_id).await?;
        tracing::info!(email = %record.email, "User verified");
        Ok(())
    }

    pub async fn login(&self, request: UserLoginRequest) -> Result<Login, AppError> {
        let email = normalize_email(&request.email);

        let user = self
            .db
            .get_user(&email)
            .await?
            .filter(|u| {
                self.credentials
                    .verify_password(&email, &request.password, &u.password_hash)
            })
            .ok_or_else(|| {
                tracing::debug!(email = %email, "Login rejected");
                AppError::Unauthorized
            })?;

        if !user.verified {
            return Err(AppError::BadRequest("user not verified".to_string()));
        }

        self.db.record_login(&email).await?;

        let now = Utc::now();
        let auth_token = self
            .credentials
            .build_auth_token(&email, now)
            .map_err(|e| AppError::Internal(e.into()))?;

        let mut profile = UserProfile::from(user);
        profile.last_login = Some(now);

        tracing::info!(email = %email, "User logged in");
        Ok(Login {
            auth_token,
            user: profile,
        })
    }

    pub async fn account(&self, email: &str) -> Result<UserProfile, AppError> {
        self.db
            .get_user(email)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| AppError::NotFound("unknown user".to_string()))
    }

    /// Delete the user's trips, leave the trips they joined, then delete the user.
    pub async fn delete_account(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .db
            .get_user(email)
            .await?
            .ok_or_else(|| AppError::NotFound("unknown user".to_string()))?;

        for direction in Direction::ALL {
            for trip_id in user.owned_trips(direction) {
                match self.db.delete_trip(direction, trip_id, email).await {
                    Ok(()) | Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
            }

            for trip_id in user.member_trips(direction) {
                match self.db.remove_member(direction, trip_id, email).await {
                    Ok(()) | Err(StoreError::NotFound) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        self.db.delete_user(email).await?;
        tracing::info!(email, "Account deleted");
        Ok(())
    }
}
