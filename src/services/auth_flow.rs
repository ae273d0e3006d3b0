// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Login, refresh and logout.
//!
//! There is no stored session. Whether a login registers a new account or
//! signs into an existing one depends only on whether the Discord ID is
//! already in the user directory, and everything a later refresh or logout
//! needs is carried inside the signed session token.

use crate::db::UserDirectory;
use crate::error::{AppError, ProfileFailure};
use crate::models::{LoginKind, LoginResponse, User, UserPermissions, UserUpdate};
use crate::services::discord::{DiscordClient, DiscordUser, OAuthResult, ProfileLookup};
use crate::services::session_token::{self, SessionTokenPayload};
use crate::time_utils::now_iso;

/// Complete a Discord login with an authorization code.
pub async fn login(
    discord: &DiscordClient,
    directory: &UserDirectory,
    jwt_secret: &[u8],
    code: &str,
    redirect_uri: &str,
    ip: &str,
) -> Result<LoginResponse, AppError> {
    let oauth = discord
        .exchange_code(code, redirect_uri)
        .await
        .map_err(|e| {
            tracing::info!(error = %e, "Authorization code exchange rejected");
            AppError::ProviderExchange("Invalid code or redirect URI.".to_string())
        })?;

    let profile = fetch_profile(discord, &oauth.access_token).await?;

    let (user, kind) = match directory.find_by_id(&profile.id).await? {
        Some(existing) => (sign_in(directory, existing, &profile, ip).await?, LoginKind::Login),
        None => {
            let now = now_iso();
            let user = User {
                id: profile.id.clone(),
                username: profile.username.clone(),
                discriminator: profile.discriminator.clone(),
                avatar: profile.avatar.clone(),
                latest_ip: ip.to_string(),
                permissions: UserPermissions::DEFAULT,
                registered: now.clone(),
                last_login_or_refresh: now,
                posts: 0,
                comments: 0,
            };
            match directory.insert(&user).await {
                Ok(()) => (user, LoginKind::Register),
                // A concurrent login registered this ID first.
                Err(AppError::Conflict(_)) => {
                    tracing::debug!(user_id = %user.id, "Lost registration race, signing in");
                    let existing = directory
                        .find_by_id(&user.id)
                        .await?
                        .ok_or_else(|| AppError::Database(format!("user {} vanished", user.id)))?;
                    (sign_in(directory, existing, &profile, ip).await?, LoginKind::Login)
                }
                Err(e) => return Err(e),
            }
        }
    };

    tracing::info!(user_id = %user.id, kind = ?kind, "User signed in");

    respond(jwt_secret, user, oauth, kind)
}

/// Apply the per-login profile refresh to an existing user.
async fn sign_in(
    directory: &UserDirectory,
    mut user: User,
    profile: &DiscordUser,
    ip: &str,
) -> Result<User, AppError> {
    let set = login_update(profile, ip);
    directory.update_fields(&user.id, &set).await?;
    user.apply(&set);
    Ok(user)
}

/// Extend a session with the Discord refresh token it carries.
pub async fn refresh(
    discord: &DiscordClient,
    directory: &UserDirectory,
    jwt_secret: &[u8],
    session: &SessionTokenPayload,
    ip: &str,
) -> Result<LoginResponse, AppError> {
    let user = directory.find_by_id(&session.id).await?.ok_or_else(|| {
        AppError::NotFound(
            "The account associated with this session no longer exists.".to_string(),
        )
    })?;

    let oauth = discord
        .refresh(&session.refresh_token)
        .await
        .map_err(|e| {
            tracing::info!(user_id = %session.id, error = %e, "Token refresh rejected");
            AppError::ProviderExchange("Invalid or expired refresh token.".to_string())
        })?;

    let profile = fetch_profile(discord, &oauth.access_token).await?;

    let user = sign_in(directory, user, &profile, ip).await?;

    tracing::info!(user_id = %user.id, "Session refreshed");

    respond(jwt_secret, user, oauth, LoginKind::Refresh)
}

/// Revoke the Discord access token behind a session.
///
/// The session token itself stays valid until it expires.
pub async fn logout(
    discord: &DiscordClient,
    session: &SessionTokenPayload,
) -> Result<(), AppError> {
    discord.revoke(&session.access_token).await.map_err(|e| {
        tracing::warn!(user_id = %session.id, error = %e, "Token revocation failed");
        AppError::ProviderExchange("Failed to revoke access token.".to_string())
    })?;

    tracing::info!(user_id = %session.id, "User logged out");
    Ok(())
}

async fn fetch_profile(
    discord: &DiscordClient,
    access_token: &str,
) -> Result<DiscordUser, AppError> {
    match discord.fetch_profile(access_token).await {
        ProfileLookup::Found(profile) => Ok(profile),
        ProfileLookup::TokenInvalid => Err(ProfileFailure::InvalidToken.into()),
        ProfileLookup::FetchFailed(e) => {
            tracing::warn!(error = %e, "Discord profile request failed");
            Err(ProfileFailure::FetchFailed.into())
        }
    }
}

/// Fields refreshed on every login or refresh.
fn login_update(profile: &DiscordUser, ip: &str) -> UserUpdate {
    UserUpdate {
        username: Some(profile.username.clone()),
        discriminator: Some(profile.discriminator.clone()),
        avatar: Some(profile.avatar.clone()),
        latest_ip: Some(ip.to_string()),
        last_login_or_refresh: Some(now_iso()),
        ..Default::default()
    }
}

fn respond(
    jwt_secret: &[u8],
    user: User,
    oauth: OAuthResult,
    kind: LoginKind,
) -> Result<LoginResponse, AppError> {
    let site_token = session_token::mint(
        jwt_secret,
        &user.id,
        &oauth.access_token,
        &oauth.refresh_token,
        oauth.expires_in,
    )?;

    Ok(LoginResponse {
        user_data: user,
        refresh_token: oauth.refresh_token,
        expires_in_seconds: oauth.expires_in,
        site_token,
        kind,
    })
}
