// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request scopes.
//!
//! A handler declares what it needs by taking one of the four context types
//! below as an extractor:
//!
//! | type                   | session   | directory |
//! |------------------------|-----------|-----------|
//! | [`Unscoped`]           | optional  | -         |
//! | [`StoreScoped`]        | optional  | yes       |
//! | [`SessionScoped`]      | required  | -         |
//! | [`SessionStoreScoped`] | required  | yes       |
//!
//! The store is checked before the session, so a deployment without
//! persistence answers 501 even to unauthenticated callers. An optional
//! session is parsed best effort and silently dropped if invalid.
//!
//! Each context has a private field, so extraction here is the only way to
//! build one.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::config::Config;
use crate::db::UserDirectory;
use crate::error::AppError;
use crate::services::session_token::{self, AuthError, SessionTokenPayload};
use crate::AppState;

/// No preconditions.
#[derive(Clone)]
pub struct Unscoped {
    pub config: Arc<Config>,
    pub session: Option<SessionTokenPayload>,
    _resolved: (),
}

/// A user directory is available.
#[derive(Clone)]
pub struct StoreScoped {
    pub config: Arc<Config>,
    pub session: Option<SessionTokenPayload>,
    pub directory: UserDirectory,
    _resolved: (),
}

/// The caller presented a valid session token.
#[derive(Clone)]
pub struct SessionScoped {
    pub config: Arc<Config>,
    pub session: SessionTokenPayload,
    _resolved: (),
}

/// Both a user directory and a valid session.
#[derive(Clone)]
pub struct SessionStoreScoped {
    pub config: Arc<Config>,
    pub session: SessionTokenPayload,
    pub directory: UserDirectory,
    _resolved: (),
}

fn require_directory(state: &AppState) -> Result<UserDirectory, AppError> {
    state.directory.clone().ok_or_else(|| {
        tracing::debug!("Rejecting store-scoped request, no store configured");
        AppError::ServiceUnavailable
    })
}

fn require_session(parts: &Parts, config: &Config) -> Result<SessionTokenPayload, AuthError> {
    let header = match parts.headers.get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::Malformed)?),
        None => None,
    };

    session_token::validate(&config.jwt_secret, header).inspect_err(|e| {
        tracing::debug!(error = %e, "Rejecting session token");
    })
}

fn optional_session(parts: &Parts, config: &Config) -> Option<SessionTokenPayload> {
    parts.headers.get(header::AUTHORIZATION)?;
    require_session(parts, config).ok()
}

impl FromRequestParts<Arc<AppState>> for Unscoped {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            config: state.config.clone(),
            session: optional_session(parts, &state.config),
            _resolved: (),
        })
    }
}

impl FromRequestParts<Arc<AppState>> for StoreScoped {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let directory = require_directory(state)?;

        Ok(Self {
            config: state.config.clone(),
            session: optional_session(parts, &state.config),
            directory,
            _resolved: (),
        })
    }
}

impl FromRequestParts<Arc<AppState>> for SessionScoped {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            config: state.config.clone(),
            session: require_session(parts, &state.config)?,
            _resolved: (),
        })
    }
}

impl FromRequestParts<Arc<AppState>> for SessionStoreScoped {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let directory = require_directory(state)?;
        let session = require_session(parts, &state.config)?;

        Ok(Self {
            config: state.config.clone(),
            session,
            directory,
            _resolved: (),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryDb;
    use axum::http::Request;

    fn state(with_store: bool) -> Arc<AppState> {
        Arc::new(AppState::new(
            Config::test_default(),
            with_store.then(|| UserDirectory::memory(MemoryDb::new())),
        ))
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn valid_token(state: &AppState) -> String {
        let token = session_token::mint(&state.config.jwt_secret, "1001", "a", "r", 60).unwrap();
        format!("Bearer {}", token)
    }

    #[tokio::test]
    async fn test_store_checked_before_session() {
        let state = state(false);

        let result = SessionStoreScoped::from_request_parts(&mut parts(None), &state).await;

        assert!(matches!(result, Err(AppError::ServiceUnavailable)));
    }

    #[tokio::test]
    async fn test_session_required() {
        let state = state(true);

        let result = SessionStoreScoped::from_request_parts(&mut parts(None), &state).await;
        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::MissingHeader))
        ));

        let result = SessionScoped::from_request_parts(&mut parts(Some("Bearer x")), &state).await;
        assert!(matches!(result, Err(AppError::Auth(AuthError::Malformed))));

        let header = valid_token(&state);
        let ctx = SessionStoreScoped::from_request_parts(&mut parts(Some(&header)), &state)
            .await
            .unwrap();
        assert_eq!(ctx.session.id, "1001");
    }

    #[tokio::test]
    async fn test_optional_session_is_best_effort() {
        let state = state(true);

        let ctx = StoreScoped::from_request_parts(&mut parts(Some("Bearer junk")), &state)
            .await
            .unwrap();
        assert!(ctx.session.is_none());

        let header = valid_token(&state);
        let ctx = Unscoped::from_request_parts(&mut parts(Some(&header)), &state)
            .await
            .unwrap();
        assert_eq!(ctx.session.map(|s| s.id).as_deref(), Some("1001"));
    }

    #[tokio::test]
    async fn test_session_scope_needs_no_store() {
        let state = state(false);
        let header = valid_token(&state);

        assert!(
            SessionScoped::from_request_parts(&mut parts(Some(&header)), &state)
                .await
                .is_ok()
        );
        assert!(matches!(
            StoreScoped::from_request_parts(&mut parts(None), &state).await,
            Err(AppError::ServiceUnavailable)
        ));
    }
}
