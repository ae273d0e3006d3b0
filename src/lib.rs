// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! AIMS backend: Discord sign-in, site sessions and user permissions.
//!
//! This crate provides the API behind a content-submission site. Users sign in
//! through Discord OAuth, receive a signed site token, and manage each other's
//! permissions within a two-rank hierarchy.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::UserDirectory;
use middleware::rate_limit::RateLimiter;
use services::DiscordClient;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Arc<Config>,
    /// `None` when the deployment has no persistence configured.
    pub directory: Option<UserDirectory>,
    pub discord: DiscordClient,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(config: Config, directory: Option<UserDirectory>) -> Self {
        Self {
            discord: DiscordClient::new(&config),
            rate_limiter: RateLimiter::from_config(&config),
            config: Arc::new(config),
            directory,
        }
    }
}
