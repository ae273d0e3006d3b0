// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod auth;
pub mod users;

use crate::middleware::ClientIp;
use crate::time_utils::now_iso;
use crate::AppState;
use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatusResponse {
    pub start_time: String,
    pub version: String,
    pub received_request: String,
}

/// Server status
async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        start_time: state.config.started_at.clone(),
        version: state.config.version.clone(),
        received_request: now_iso(),
    })
}

/// The caller's IP as this server sees it.
async fn ip(ClientIp(ip): ClientIp) -> String {
    ip
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // No configured client URLs means any origin may call the API.
    let origins = if state.config.client_urls.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            state
                .config
                .client_urls
                .iter()
                .filter_map(|url| HeaderValue::from_str(url).ok()),
        )
    };

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    Router::new()
        .route("/", get(status))
        .route("/ip", get(ip))
        .merge(auth::routes())
        .merge(users::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::rate_limit::limit_requests,
        ))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
