// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth_flow;
pub mod discord;
pub mod permissions;
pub mod session_token;

pub use discord::{DiscordClient, OAuthResult, ProfileLookup};
pub use permissions::{PermissionChange, PermissionDenial};
pub use session_token::{AuthError, SessionTokenPayload};
