// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Site session tokens.
//!
//! A session token is an HS256 JWT carrying the Discord user ID and the
//! Discord access/refresh tokens of that session. Nothing is stored server
//! side: a token is valid exactly when its signature checks out and `exp` has
//! not passed.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time_utils::unix_now;

const BEARER_PREFIX: &str = "bearer ";

/// What is stored in a site token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokenPayload {
    /// Discord user ID, the key of the user record.
    pub id: String,
    /// Discord access token, needed for revocation.
    pub access_token: String,
    /// Discord refresh token, needed to extend the session.
    pub refresh_token: String,
}

#[derive(Serialize)]
struct Claims<'a> {
    id: &'a str,
    access_token: &'a str,
    refresh_token: &'a str,
    iat: i64,
    exp: i64,
}

/// Reasons a session token is rejected. All map to 401.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Jwt malformed")]
    Malformed,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token has invalid payload type (expected object)")]
    InvalidPayloadType,

    #[error("Token lacks an expiration date")]
    MissingExpiration,

    #[error("No ID in payload")]
    MissingId,

    #[error("No access_token in payload")]
    MissingAccessToken,

    #[error("No refresh_token in payload")]
    MissingRefreshToken,

    #[error("Jwt expired")]
    Expired,
}

/// Create a session token that expires `ttl_seconds` from now.
pub fn mint(
    secret: &[u8],
    id: &str,
    access_token: &str,
    refresh_token: &str,
    ttl_seconds: i64,
) -> anyhow::Result<String> {
    let now = unix_now();

    let claims = Claims {
        id,
        access_token,
        refresh_token,
        iat: now,
        exp: now.saturating_add(ttl_seconds),
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Validate the value of an `Authorization` header.
pub fn validate(secret: &[u8], header: Option<&str>) -> Result<SessionTokenPayload, AuthError> {
    let mut token = header.ok_or(AuthError::MissingHeader)?.trim();

    if token
        .get(..BEARER_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(BEARER_PREFIX))
    {
        token = &token[BEARER_PREFIX.len()..];
    }

    // A bad header is a malformed token; claims that fail to parse after the
    // header and signature check out are a payload problem.
    decode_header(token).map_err(|_| AuthError::Malformed)?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<Value>(token, &DecodingKey::from_secret(secret), &validation).map_err(
        |e| match e.kind() {
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::Json(_) => AuthError::InvalidPayloadType,
            _ => AuthError::Malformed,
        },
    )?;

    let claims = data.claims.as_object().ok_or(AuthError::InvalidPayloadType)?;

    let exp = claims
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(AuthError::MissingExpiration)?;

    if unix_now() >= exp {
        return Err(AuthError::Expired);
    }

    let field = |name: &str, missing: AuthError| {
        claims
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(missing)
    };

    Ok(SessionTokenPayload {
        id: field("id", AuthError::MissingId)?,
        access_token: field("access_token", AuthError::MissingAccessToken)?,
        refresh_token: field("refresh_token", AuthError::MissingRefreshToken)?,
    })
}
