//! Application configuration loaded from environment variables.
//!
//! Configuration is read once at startup and passed around explicitly inside
//! `AppState`; nothing here is global, so tests can run with their own
//! secrets side by side.

use ring::rand::{SecureRandom, SystemRandom};
use std::env;

/// Which document store backs the `users` collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Firestore (or its emulator)
    Firestore { project_id: String },
    /// Process-local store, lost on restart
    Memory,
    /// No persistence; store-scoped endpoints answer 501
    None,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Origins allowed by CORS; empty allows any origin
    pub client_urls: Vec<String>,
    /// Number of trusted reverse proxies in front of the server
    pub num_proxies: usize,
    /// Requests one client may make per minute
    pub max_requests_per_minute: u32,
    /// Values of `RateLimit-Bypass-Token` that skip the rate limit
    pub rate_limit_bypass_tokens: Vec<String>,
    /// Secret used to sign session tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// Discord OAuth client ID (public)
    pub discord_client_id: String,
    /// Discord OAuth client secret
    pub discord_client_secret: String,
    /// Base URL of the Discord REST API
    pub discord_api_base: String,
    /// Discord authorization page
    pub discord_authorize_url: String,
    /// Redirect URI embedded in links from `/makeLoginLink`
    pub login_redirect_uri: String,
    pub store: StoreBackend,

    // --- Filled in automatically ---
    pub version: String,
    pub started_at: String,
}

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_DISCORD_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_REQUESTS_PER_MINUTE: u32 = 30;

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: DEFAULT_PORT,
            client_urls: Vec::new(),
            num_proxies: 0,
            max_requests_per_minute: 1000,
            rate_limit_bypass_tokens: Vec::new(),
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            discord_client_id: "test_client_id".to_string(),
            discord_client_secret: "test_secret".to_string(),
            discord_api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            discord_authorize_url: DEFAULT_DISCORD_AUTHORIZE_URL.to_string(),
            login_redirect_uri: format!("http://localhost:{}/static/discordOAuth2", DEFAULT_PORT),
            store: StoreBackend::Memory,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: crate::time_utils::now_iso(),
        }
    }

    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let port = match env::var("PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid("PORT", v))?,
            Err(_) => DEFAULT_PORT,
        };

        let num_proxies = match env::var("NUM_PROXIES") {
            Ok(v) => v.parse().map_err(|_| ConfigError::Invalid("NUM_PROXIES", v))?,
            Err(_) => 0,
        };

        let max_requests_per_minute = match env::var("MAX_REQUESTS_PER_MINUTE") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("MAX_REQUESTS_PER_MINUTE", v))?,
            Err(_) => DEFAULT_MAX_REQUESTS_PER_MINUTE,
        };

        let client_urls = comma_list("CLIENT_URLS");
        let rate_limit_bypass_tokens = comma_list("RATE_LIMIT_BYPASS_TOKENS");

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(v) => v.into_bytes(),
            Err(_) => {
                tracing::warn!("No JWT_SECRET set, sessions will not persist between restarts");
                random_secret()?
            }
        };

        let store = match env::var("STORE_BACKEND").as_deref() {
            Ok("firestore") => StoreBackend::Firestore {
                project_id: env::var("GCP_PROJECT_ID")
                    .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            },
            Ok("memory") => StoreBackend::Memory,
            Ok("none") | Err(_) => StoreBackend::None,
            Ok(other) => return Err(ConfigError::Invalid("STORE_BACKEND", other.to_string())),
        };

        Ok(Self {
            port,
            client_urls,
            num_proxies,
            max_requests_per_minute,
            rate_limit_bypass_tokens,
            jwt_secret,
            discord_client_id: env::var("DISCORD_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("DISCORD_CLIENT_ID"))?,
            discord_client_secret: env::var("DISCORD_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("DISCORD_CLIENT_SECRET"))?,
            discord_api_base: env::var("DISCORD_API_BASE")
                .unwrap_or_else(|_| DEFAULT_DISCORD_API_BASE.to_string()),
            discord_authorize_url: env::var("DISCORD_AUTHORIZE_URL")
                .unwrap_or_else(|_| DEFAULT_DISCORD_AUTHORIZE_URL.to_string()),
            login_redirect_uri: env::var("LOGIN_REDIRECT_URI")
                .unwrap_or_else(|_| format!("http://localhost:{}/static/discordOAuth2", port)),
            store,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: crate::time_utils::now_iso(),
        })
    }
}

/// Comma-separated env var, blanks dropped; unset means empty.
fn comma_list(name: &str) -> Vec<String> {
    env::var(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// 8 random bytes, hex encoded.
fn random_secret() -> Result<Vec<u8>, ConfigError> {
    let mut bytes = [0u8; 8];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| ConfigError::Random)?;
    Ok(hex::encode(bytes).into_bytes())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),

    #[error("Failed to generate a random JWT secret")]
    Random,
}
