// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Discord OAuth2 client.
//!
//! Handles:
//! - Authorization link generation
//! - Code exchange, token refresh and token revocation
//! - Fetching the profile behind an access token
//!
//! Nothing here retries; failures are returned to the caller as-is.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{de::DeserializeOwned, Deserialize};

use crate::config::Config;

const STATE_BYTES: usize = 16;
const SCOPES: &[&str] = &["identify"];

/// Errors talking to Discord.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Discord request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Discord returned HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to generate OAuth state")]
    Random,
}

/// Token response from the Discord token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthResult {
    pub access_token: String,
    pub refresh_token: String,
    /// Seconds until `access_token` expires.
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub token_type: String,
}

/// The subset of a Discord user we store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub discriminator: String,
    pub avatar: Option<String>,
}

/// Outcome of looking up the profile behind an access token.
#[derive(Debug)]
pub enum ProfileLookup {
    Found(DiscordUser),
    /// Discord answered 401: the access token is not usable.
    TokenInvalid,
    /// The request itself failed (network, non-401 status, bad body).
    FetchFailed(ProviderError),
}

/// Discord API client.
#[derive(Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    api_base: String,
    authorize_url: String,
    client_id: String,
    client_secret: String,
}

impl DiscordClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.discord_api_base.trim_end_matches('/').to_string(),
            authorize_url: config.discord_authorize_url.clone(),
            client_id: config.discord_client_id.clone(),
            client_secret: config.discord_client_secret.clone(),
        }
    }

    /// Build a link for signing into the site.
    ///
    /// Every call embeds a fresh random `state` value.
    pub fn build_authorization_link(&self, redirect_uri: &str) -> Result<String, ProviderError> {
        let mut state = [0u8; STATE_BYTES];
        SystemRandom::new()
            .fill(&mut state)
            .map_err(|_| ProviderError::Random)?;

        Ok(format!(
            "{}?response_type=code&client_id={}&state={}&redirect_uri={}&prompt=consent&scope={}",
            self.authorize_url,
            urlencoding::encode(&self.client_id),
            hex::encode(state),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
        ))
    }

    /// Upgrade an authorization code into an access token.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthResult, ProviderError> {
        self.post_token(&[
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .await
    }

    /// Exchange a refresh token for a new token pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<OAuthResult, ProviderError> {
        self.post_token(&[
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    /// Invalidate an access token.
    pub async fn revoke(&self, access_token: &str) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(format!("{}/oauth2/token/revoke", self.api_base))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("token", access_token),
            ])
            .send()
            .await?;

        check_response(response).await?;
        tracing::debug!("Discord token revoked");
        Ok(())
    }

    /// Get the Discord user an access token belongs to.
    pub async fn fetch_profile(&self, access_token: &str) -> ProfileLookup {
        let response = match self
            .http
            .get(format!("{}/users/@me", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return ProfileLookup::FetchFailed(e.into()),
        };

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return ProfileLookup::TokenInvalid;
        }

        match check_response_json(response).await {
            Ok(user) => ProfileLookup::Found(user),
            Err(e) => ProfileLookup::FetchFailed(e),
        }
    }

    async fn post_token(&self, fields: &[(&str, &str)]) -> Result<OAuthResult, ProviderError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(fields);

        let response = self
            .http
            .post(format!("{}/oauth2/token", self.api_base))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        check_response_json(response).await
    }
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!("Discord rate limit hit (429)");
    }

    Err(ProviderError::Status { status, body })
}

/// Check response and parse JSON body.
async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    Ok(check_response(response).await?.json().await?)
}
