// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.
//!
//! Handlers only choose which [`AppError`] to return; turning it into a status
//! code and JSON body happens once, in [`IntoResponse`] below. Every body has a
//! `message` field, and validation failures also carry an `errors` array.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::services::permissions::PermissionDenial;
use crate::services::session_token::AuthError;

/// Why the Discord profile could not be fetched after a successful token exchange.
///
/// Both map to a 500, but the messages differ so clients and tests can tell a
/// dead-on-arrival access token from a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProfileFailure {
    #[error("Generated invalid access token.")]
    InvalidToken,

    #[error("Failed to get Discord user info.")]
    FetchFailed,
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("The account associated with your credentials could not be found, it may have been deleted")]
    AccountDeleted,

    /// Discord rejected a code, refresh token or revocation.
    #[error("{0}")]
    ProviderExchange(String),

    #[error(transparent)]
    ProviderProfile(#[from] ProfileFailure),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Forbidden(#[from] PermissionDenial),

    /// No document store is configured for this deployment.
    #[error("This server has no persistence backing configured.")]
    ServiceUnavailable,

    #[error("Request body failed validation.")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    /// A document with the same ID already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests, please try again later.")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

/// One failed validation rule.
#[derive(Debug, Serialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) | AppError::AccountDeleted => StatusCode::UNAUTHORIZED,
            AppError::ProviderExchange(_)
            | AppError::Validation(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::ProviderProfile(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::ServiceUnavailable => StatusCode::NOT_IMPLEMENTED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, errors) = match &self {
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                ("Database error".to_string(), None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                ("Internal server error".to_string(), None)
            }
            AppError::Validation(errors) => (self.to_string(), Some(flatten_errors(errors))),
            AppError::BadRequest(_) => (self.to_string(), Some(Vec::new())),
            AppError::ProviderProfile(failure) => {
                tracing::error!(failure = ?failure, "Discord profile lookup failed");
                (self.to_string(), None)
            }
            _ => (self.to_string(), None),
        };

        (status, Json(ErrorResponse { message, errors })).into_response()
    }
}

/// Flatten nested validator errors into `field.path` entries.
///
/// Paths use the camelCase names clients send, not the Rust field names.
pub fn flatten_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_errors("", errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.code.cmp(&b.code)));
    out
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let field = camel_case(field);
        let path = if prefix.is_empty() {
            field
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(field_errors.iter().map(|e| FieldError {
                    field: path.clone(),
                    code: e.code.to_string(),
                    message: e.message.as_ref().map(|m| m.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_errors(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect_errors(&format!("{}[{}]", path, index), nested, out);
                }
            }
        }
    }
}

/// `per_page` -> `perPage`, matching `#[serde(rename_all = "camelCase")]`.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
