// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User lookup and permission management routes.

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

use crate::db::UserDirectory;
use crate::error::{AppError, Result};
use crate::middleware::{SessionStoreScoped, StoreScoped, ValidatedJson};
use crate::models::{ClientFacingUser, User, UserPermissions};
use crate::services::permissions::{self, PermissionChange};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/@me", get(get_me))
        .route("/users/all", post(get_all_users))
        .route("/users/{id}", get(get_user_by_id).patch(modify_user_permissions))
}

// ─── Requests / Responses ────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInput {
    /// Zero-based page index.
    pub page: u64,
    #[validate(range(min = 1, max = 100))]
    pub per_page: u64,
}

/// Body of `POST /users/all`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetAllUsersRequest {
    #[validate(nested)]
    pub pagination: PaginationInput,
    /// Only list these users. `null` lists everyone.
    #[serde(default)]
    pub with_ids: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PaginationResponse {
    /// Number of users matching the filter, across all pages.
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub item_count: u64,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GetAllUsersResponse {
    pub users: Vec<ClientFacingUser>,
    pub pagination: PaginationResponse,
}

/// Body of `PATCH /users/{id}`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ModifyPermissionsRequest {
    #[validate(custom(function = "known_permission_bits"))]
    pub new_permissions: UserPermissions,
}

fn known_permission_bits(permissions: &UserPermissions) -> std::result::Result<(), ValidationError> {
    if UserPermissions::all().contains(*permissions) {
        Ok(())
    } else {
        Err(ValidationError::new("unknown_permission_bits")
            .with_message("Permissions contain unknown bits".into()))
    }
}

// ─── Handlers ────────────────────────────────────────────────

/// Get the caller's own user record, IP included.
async fn get_me(ctx: SessionStoreScoped) -> Result<Json<User>> {
    let user = ctx
        .directory
        .find_by_id(&ctx.session.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Get any user. The IP is shown to the user themselves and to owners.
async fn get_user_by_id(
    ctx: StoreScoped,
    Path(id): Path<String>,
) -> Result<Json<ClientFacingUser>> {
    let user = ctx
        .directory
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let show_ip = match &ctx.session {
        None => false,
        Some(session) if session.id == id => true,
        Some(session) => is_owner(&ctx.directory, &session.id).await?,
    };

    Ok(Json(user.client_facing(show_ip)))
}

/// List users one page at a time. IPs are shown to owners only.
async fn get_all_users(
    ctx: StoreScoped,
    ValidatedJson(body): ValidatedJson<GetAllUsersRequest>,
) -> Result<Json<GetAllUsersResponse>> {
    let show_ips = match &ctx.session {
        Some(session) => is_owner(&ctx.directory, &session.id).await?,
        None => false,
    };

    let PaginationInput { page, per_page } = body.pagination;
    let ids = body.with_ids.as_deref();

    let (item_count, users) = tokio::try_join!(
        ctx.directory.count(ids),
        ctx.directory.page(ids, page.saturating_mul(per_page), per_page),
    )?;

    Ok(Json(GetAllUsersResponse {
        users: users
            .into_iter()
            .map(|u| u.client_facing(show_ips))
            .collect(),
        pagination: PaginationResponse { item_count },
    }))
}

/// Change another user's (or the caller's own) permissions.
///
/// 200 when the permissions changed, 204 when they already matched.
async fn modify_user_permissions(
    ctx: SessionStoreScoped,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<ModifyPermissionsRequest>,
) -> Result<StatusCode> {
    let change = permissions::modify_user_permissions(
        &ctx.directory,
        &ctx.session.id,
        &id,
        body.new_permissions,
    )
    .await?;

    Ok(match change {
        PermissionChange::Changed => StatusCode::OK,
        PermissionChange::Unchanged => StatusCode::NO_CONTENT,
    })
}

/// A deleted requester counts as not an owner.
async fn is_owner(directory: &UserDirectory, id: &str) -> Result<bool> {
    Ok(directory
        .find_by_id(id)
        .await?
        .is_some_and(|u| u.permissions.is_owner()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_permission_bits_rejected() {
        let body: ModifyPermissionsRequest =
            serde_json::from_str(r#"{"newPermissions": 64}"#).unwrap();
        assert!(body.validate().is_err());

        let body: ModifyPermissionsRequest =
            serde_json::from_str(r#"{"newPermissions": 31}"#).unwrap();
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_per_page_bounds() {
        let body: GetAllUsersRequest =
            serde_json::from_str(r#"{"pagination": {"page": 0, "perPage": 0}, "withIds": null}"#)
                .unwrap();
        assert!(body.validate().is_err());

        let body: GetAllUsersRequest =
            serde_json::from_str(r#"{"pagination": {"page": 3, "perPage": 100}}"#).unwrap();
        assert!(body.validate().is_ok());
        assert!(body.with_ids.is_none());
    }
}
