// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use aims_backend::config::Config;
use aims_backend::db::{FirestoreDb, MemoryDb, UserDirectory};
use aims_backend::models::{User, UserPermissions};
use aims_backend::routes::create_router;
use aims_backend::services::session_token;
use aims_backend::AppState;
use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use http_body_util::BodyExt;
use std::sync::Arc;
use wiremock::matchers::{header as header_matcher, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// A router wired to an in-memory store and a mock Discord.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub directory: UserDirectory,
    pub discord: MockServer,
}

impl TestApp {
    /// Send one request through a fresh clone of the router.
    #[allow(dead_code)]
    pub async fn send(&self, request: Request<Body>) -> Response {
        use tower::ServiceExt;

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// A valid session token for `id`.
    #[allow(dead_code)]
    pub fn token(&self, id: &str) -> String {
        site_token(&self.state.config, id, "access", "refresh")
    }
}

/// Create a test app with an in-memory store and a mock Discord API.
#[allow(dead_code)]
pub async fn create_test_app() -> TestApp {
    create_test_app_with(|_| {}).await
}

/// Like [`create_test_app`], with config adjusted by `configure`.
#[allow(dead_code)]
pub async fn create_test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let discord = MockServer::start().await;
    let directory = UserDirectory::memory(MemoryDb::new());
    let mut config = Config {
        discord_api_base: discord.uri(),
        ..Config::test_default()
    };
    configure(&mut config);

    let state = Arc::new(AppState::new(config, Some(directory.clone())));

    TestApp {
        router: create_router(state.clone()),
        state,
        directory,
        discord,
    }
}

/// Create a test app for a deployment without persistence.
#[allow(dead_code)]
pub async fn create_test_app_without_store() -> (axum::Router, Arc<AppState>, MockServer) {
    let discord = MockServer::start().await;
    let config = Config {
        discord_api_base: discord.uri(),
        ..Config::test_default()
    };

    let state = Arc::new(AppState::new(config, None));
    (create_router(state.clone()), state, discord)
}

/// Mint a session token the way the login flow does.
#[allow(dead_code)]
pub fn site_token(config: &Config, id: &str, access: &str, refresh: &str) -> String {
    session_token::mint(&config.jwt_secret, id, access, refresh, 3600)
        .expect("Failed to create session token")
}

/// A stored user with the given permissions.
#[allow(dead_code)]
pub fn test_user(id: &str, permissions: UserPermissions) -> User {
    User {
        id: id.to_string(),
        username: format!("user-{}", id),
        discriminator: "0001".to_string(),
        avatar: None,
        latest_ip: format!("10.0.0.{}", id.len()),
        permissions,
        registered: "2026-01-01T00:00:00.000Z".to_string(),
        last_login_or_refresh: "2026-01-01T00:00:00.000Z".to_string(),
        posts: 2,
        comments: 5,
    }
}

/// Build a request, optionally authenticated and with a JSON body.
#[allow(dead_code)]
pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as bytes.
#[allow(dead_code)]
pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes()
        .to_vec()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Body is not JSON")
}

/// Token endpoint answers with the given token pair.
#[allow(dead_code)]
pub fn token_response(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 604800,
        "scope": "identify",
        "token_type": "Bearer"
    }))
}

/// `/users/@me` answers with a Discord profile for this access token.
#[allow(dead_code)]
pub async fn mock_profile(server: &MockServer, access: &str, id: &str, username: &str) {
    Mock::given(method("GET"))
        .and(path("/users/@me"))
        .and(header_matcher("authorization", format!("Bearer {}", access).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": id,
            "username": username,
            "discriminator": "0420",
            "avatar": "a_1234"
        })))
        .mount(server)
        .await;
}
