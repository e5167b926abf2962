// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, security, alerting).

pub mod alert;
pub mod auth;
pub mod security;

pub use auth::{require_auth, require_auth_redirect, AuthUser};
