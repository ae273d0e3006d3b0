// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord login, session refresh and logout routes.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::{
    ClientIp, SessionScoped, SessionStoreScoped, StoreScoped, Unscoped, ValidatedJson,
};
use crate::models::LoginResponse;
use crate::services::auth_flow;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/makeLoginLink", get(make_login_link))
        .route("/login", post(login))
        .route("/refresh", get(refresh))
        .route("/logout", get(logout))
}

/// Body of `POST /login`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Authorization code from the Discord redirect.
    #[validate(length(min = 1, message = "Code cannot be empty"))]
    pub code: String,
    /// Must match the redirect URI the code was issued for.
    #[serde(alias = "redirect_uri")]
    #[validate(length(min = 1, message = "Redirect URI cannot be empty"))]
    pub redirect_uri: String,
}

/// Get a Discord authorization link, as plain text.
async fn make_login_link(
    State(state): State<Arc<AppState>>,
    ctx: Unscoped,
) -> Result<String> {
    state
        .discord
        .build_authorization_link(&ctx.config.login_redirect_uri)
        .map_err(|e| AppError::Internal(e.into()))
}

/// Exchange an authorization code for a site session.
async fn login(
    State(state): State<Arc<AppState>>,
    ctx: StoreScoped,
    ClientIp(ip): ClientIp,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = auth_flow::login(
        &state.discord,
        &ctx.directory,
        &ctx.config.jwt_secret,
        &body.code,
        &body.redirect_uri,
        &ip,
    )
    .await?;

    Ok(Json(response))
}

/// Extend the caller's session.
async fn refresh(
    State(state): State<Arc<AppState>>,
    ctx: SessionStoreScoped,
    ClientIp(ip): ClientIp,
) -> Result<Json<LoginResponse>> {
    let response = auth_flow::refresh(
        &state.discord,
        &ctx.directory,
        &ctx.config.jwt_secret,
        &ctx.session,
        &ip,
    )
    .await?;

    Ok(Json(response))
}

/// Revoke the caller's Discord access token. Responds 200 with no body.
async fn logout(State(state): State<Arc<AppState>>, ctx: SessionScoped) -> Result<StatusCode> {
    auth_flow::logout(&state.discord, &ctx.session).await?;
    Ok(StatusCode::OK)
}
