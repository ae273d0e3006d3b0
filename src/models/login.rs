// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Response body for the login and refresh endpoints.

use crate::models::User;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Which branch of the session flow produced a [`LoginResponse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum LoginKind {
    Register,
    Login,
    Refresh,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user_data: User,
    /// Discord refresh token, used to extend the session.
    pub refresh_token: String,
    /// Seconds until `site_token` expires.
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub expires_in_seconds: i64,
    /// Signed session token for the `Authorization` header.
    pub site_token: String,
    #[serde(rename = "type")]
    pub kind: LoginKind,
}
