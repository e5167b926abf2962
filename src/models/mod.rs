// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod subscription;
pub mod trip;
pub mod user;

pub use subscription::{NewSubscription, Subscription, VerificationRecord};
pub use trip::{Direction, NewTrip, Trip, TripQuery};
pub use user::{normalize_email, NewUser, User, UserProfile};
