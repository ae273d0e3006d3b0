// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Request extractors and middleware.

pub mod client_ip;
pub mod rate_limit;
pub mod scope;
pub mod validated;

pub use client_ip::ClientIp;
pub use scope::{SessionScoped, SessionStoreScoped, StoreScoped, Unscoped};
pub use validated::ValidatedJson;
