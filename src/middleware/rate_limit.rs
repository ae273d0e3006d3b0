// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-client request cap over a fixed one-minute window.
//!
//! Clients are keyed by their resolved [`ClientIp`]. A request carrying a
//! known `RateLimit-Bypass-Token` is neither counted nor limited; an unknown
//! token is counted like any other request. Either way the response says
//! which it was in `RateLimit-Bypass-Response`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::ClientIp;
use crate::AppState;

const WINDOW: Duration = Duration::from_secs(60);
// Expired windows are swept once this many clients are tracked.
const MAX_TRACKED_CLIENTS: usize = 10_000;

pub const BYPASS_TOKEN_HEADER: HeaderName = HeaderName::from_static("ratelimit-bypass-token");
pub const BYPASS_RESPONSE_HEADER: HeaderName =
    HeaderName::from_static("ratelimit-bypass-response");
const LIMIT_HEADER: HeaderName = HeaderName::from_static("ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("ratelimit-reset");

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_in_seconds: u64,
}

/// In-memory fixed-window rate limiter.
pub struct RateLimiter {
    limit: u32,
    bypass_tokens: HashSet<String>,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, bypass_tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            limit,
            bypass_tokens: bypass_tokens.into_iter().collect(),
            windows: DashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.max_requests_per_minute,
            config.rate_limit_bypass_tokens.iter().cloned(),
        )
    }

    pub fn is_bypass_token(&self, token: &str) -> bool {
        self.bypass_tokens.contains(token)
    }

    /// Count one request from `client`.
    pub fn check(&self, client: &str) -> RateLimitDecision {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> RateLimitDecision {
        if self.windows.len() > MAX_TRACKED_CLIENTS {
            self.windows
                .retain(|_, w| now.saturating_duration_since(w.started) < WINDOW);
        }

        let mut window = self.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.saturating_duration_since(window.started) >= WINDOW {
            *window = Window {
                started: now,
                count: 0,
            };
        }
        window.count = window.count.saturating_add(1);

        let elapsed = now.saturating_duration_since(window.started);
        RateLimitDecision {
            allowed: window.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
            reset_in_seconds: WINDOW.saturating_sub(elapsed).as_secs().max(1),
        }
    }
}

/// Middleware enforcing the per-client cap.
pub async fn limit_requests(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    request: Request,
    next: Next,
) -> Response {
    let limiter = &state.rate_limiter;
    let bypass = request
        .headers()
        .get(BYPASS_TOKEN_HEADER)
        .map(|v| v.to_str().is_ok_and(|token| limiter.is_bypass_token(token)));

    if bypass == Some(true) {
        let mut response = next.run(request).await;
        response
            .headers_mut()
            .insert(BYPASS_RESPONSE_HEADER, HeaderValue::from_static("Valid"));
        return response;
    }

    let decision = limiter.check(&ip);
    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(client_ip = %ip, limit = decision.limit, "Rate limit exceeded");
        AppError::RateLimited.into_response()
    };

    let headers = response.headers_mut();
    add_rate_limit_headers(headers, &decision);
    if bypass == Some(false) {
        headers.insert(BYPASS_RESPONSE_HEADER, HeaderValue::from_static("Invalid"));
    }
    response
}

fn add_rate_limit_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(decision.reset_in_seconds));
}
