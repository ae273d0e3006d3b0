// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client IP resolution behind a known number of reverse proxies.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{request::Parts, HeaderMap};

use crate::AppState;

const UNKNOWN_IP: &str = "unknown";

/// The caller's IP address.
///
/// The hop chain is every `X-Forwarded-For` entry followed by the socket
/// peer. With `num_proxies` trusted proxies, the client is the entry that
/// many hops in from the right end of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientIp(resolve(
            &parts.headers,
            peer,
            state.config.num_proxies,
        )))
    }
}

fn resolve(headers: &HeaderMap, peer: Option<String>, num_proxies: usize) -> String {
    let mut hops: Vec<String> = if num_proxies > 0 {
        headers
            .get_all("x-forwarded-for")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };
    hops.extend(peer);

    let index = hops.len().saturating_sub(num_proxies + 1);
    hops.into_iter()
        .nth(index)
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}
