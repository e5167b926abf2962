// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod accounts;
pub mod credentials;
pub mod destinations;
pub mod mailer;
pub mod trips;

pub use accounts::AccountService;
pub use credentials::{AuthToken, CredentialError, Credentials};
pub use destinations::{DestinationError, DestinationRegistry};
pub use mailer::{MailError, Mailer, Outbox};
pub use trips::TripService;
