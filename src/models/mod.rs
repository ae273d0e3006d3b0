// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod login;
pub mod permissions;
pub mod user;

pub use login::{LoginKind, LoginResponse};
pub use permissions::UserPermissions;
pub use user::{ClientFacingUser, User, UserUpdate};
