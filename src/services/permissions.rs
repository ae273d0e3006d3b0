// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Permission changes between users.
//!
//! The hierarchy has two ranks above ordinary users: owners, and holders of
//! `ASSIGN_PERMISSIONS`. [`authorize`] is the pure decision; the first rule
//! that matches wins. [`modify_user_permissions`] loads both users, decides
//! and writes.

use crate::db::UserDirectory;
use crate::error::AppError;
use crate::models::{User, UserPermissions, UserUpdate};

/// Why a permission change was refused. All map to 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PermissionDenial {
    #[error("Cannot remove the owner permission from yourself.")]
    OwnerSelfDemotion,

    #[error("This user is also an owner, so you cannot modify their permissions.")]
    PeerOwner,

    #[error("Cannot give out the owner permission.")]
    CannotGiveOwner,

    #[error("You do not have permission to modify users.")]
    NotAssigner,

    #[error("Cannot remove the assign permission from yourself.")]
    AssignerSelfDemotion,

    #[error("This user is an owner, so you cannot modify their permissions.")]
    TargetIsOwner,

    #[error("This user can also assign permissions, so you cannot modify their permissions.")]
    PeerAssigner,

    #[error("Cannot give out the assign permission.")]
    CannotGiveAssign,
}

/// Result of an allowed permission change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionChange {
    /// The new set equals the current one; nothing to write.
    Unchanged,
    Changed,
}

/// Decide whether `requester` may set `target`'s permissions to `new`.
pub fn authorize(
    requester: &User,
    target: &User,
    new: UserPermissions,
) -> Result<PermissionChange, PermissionDenial> {
    let is_self = requester.id == target.id;

    if requester.permissions.is_owner() {
        if is_self && !new.is_owner() {
            return Err(PermissionDenial::OwnerSelfDemotion);
        }
        if !is_self && target.permissions.is_owner() {
            return Err(PermissionDenial::PeerOwner);
        }
        if !is_self && new.is_owner() {
            return Err(PermissionDenial::CannotGiveOwner);
        }
        return Ok(compare(target.permissions, new));
    }

    if !requester.permissions.can_assign() {
        return Err(PermissionDenial::NotAssigner);
    }

    if new.is_owner() {
        return Err(PermissionDenial::CannotGiveOwner);
    }

    if is_self {
        if !new.can_assign() {
            return Err(PermissionDenial::AssignerSelfDemotion);
        }
    } else {
        if target.permissions.is_owner() {
            return Err(PermissionDenial::TargetIsOwner);
        }
        if target.permissions.can_assign() {
            return Err(PermissionDenial::PeerAssigner);
        }
        if new.can_assign() {
            return Err(PermissionDenial::CannotGiveAssign);
        }
    }

    Ok(compare(target.permissions, new))
}

fn compare(current: UserPermissions, new: UserPermissions) -> PermissionChange {
    if current == new {
        PermissionChange::Unchanged
    } else {
        PermissionChange::Changed
    }
}

/// Load requester and target, authorize the change and persist it.
///
/// Nothing is written when the change is [`PermissionChange::Unchanged`].
pub async fn modify_user_permissions(
    directory: &UserDirectory,
    requester_id: &str,
    target_id: &str,
    new: UserPermissions,
) -> Result<PermissionChange, AppError> {
    let requester = directory
        .find_by_id(requester_id)
        .await?
        .ok_or(AppError::AccountDeleted)?;

    let target = if requester_id == target_id {
        requester.clone()
    } else {
        directory
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?
    };

    let change = authorize(&requester, &target, new)?;

    if change == PermissionChange::Changed {
        let set = UserUpdate {
            permissions: Some(new),
            ..Default::default()
        };
        directory.update_fields(target_id, &set).await?;

        tracing::info!(
            requester = %requester_id,
            target = %target_id,
            from = target.permissions.bits(),
            to = new.bits(),
            "Changed user permissions"
        );
    }

    Ok(change)
}
