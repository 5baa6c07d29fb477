// ABOUTME: Outbound HTTP client shared by the Neynar, OAuth and platform publishers
// ABOUTME: One pooled client per server with fixed request and connect timeouts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::time::Duration;

use nora_core::constants::limits::EXTERNAL_HTTP_TIMEOUT_SECS;
use reqwest::Client;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("nora-health-server/", env!("CARGO_PKG_VERSION"));

/// Client for Neynar and social platform API calls
///
/// Falls back to reqwest's defaults if the TLS backend cannot be initialized
/// with the custom settings.
#[must_use]
pub fn api_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(EXTERNAL_HTTP_TIMEOUT_SECS))
        .connect_timeout(CONNECT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!("Falling back to default HTTP client: {e}");
            Client::new()
        })
}
