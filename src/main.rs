// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AIMS API Server
//!
//! Signs users in with Discord, issues site session tokens and manages user
//! permissions.

use aims_backend::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryDb, UserDirectory},
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        version = %config.version,
        "Starting AIMS API"
    );

    let directory = match &config.store {
        StoreBackend::Firestore { project_id } => {
            Some(UserDirectory::firestore(FirestoreDb::new(project_id).await?))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory user store, data is lost on restart");
            Some(UserDirectory::memory(MemoryDb::new()))
        }
        StoreBackend::None => {
            tracing::warn!("No user store configured, store-scoped endpoints will answer 501");
            None
        }
    };

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), directory));

    // Build router
    let app = aims_backend::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("aims_backend=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
