// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! IGetBack API Server
//!
//! Coordinates shared rides between campus and the airport.

use igetback::{
    config::{Config, ConfigSource},
    db::Database,
    services::{Credentials, DestinationRegistry, Mailer},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment
    let source = ConfigSource::from_env();
    let config = Config::from_source(&source)?;

    // Initialize structured JSON logging
    init_logging(config.log_debug)?;
    source.log_unset_keys();
    tracing::info!(
        port = config.port,
        production = config.production,
        "Starting IGetBack API"
    );

    // Load destinations; serving with an empty registry would reject every trip
    tracing::info!(dir = %config.data_dir, "Loading destinations");
    let destinations = DestinationRegistry::load_from_dir(&config.data_dir)?;

    let credentials = Credentials::new(&config.crypt_pass)?;
    let mailer = Mailer::from_config(&config)?;

    let db = Database::connect(config.gcp_project_id.as_deref()).await?;
    tracing::info!(store = db.backend_name(), "Database ready");

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        db,
        destinations,
        credentials,
        mailer,
    ));

    // Build router
    let app = igetback::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging(debug: bool) -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let crate_level = if debug { "igetback=debug" } else { "igetback=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(crate_level.parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
