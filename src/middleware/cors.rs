// ABOUTME: CORS policy for browser clients of the API
// ABOUTME: Either any origin without credentials, or an explicit list that may send the session cookie
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    HeaderName, HeaderValue, Method,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use super::tracing::REQUEST_ID_HEADER;
use crate::config::environment::CorsConfig;

/// Origins from a comma separated `CORS_ALLOWED_ORIGINS`, skipping blanks and invalid values
fn parse_origins(allowed_origins: &str) -> Vec<HeaderValue> {
    allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match HeaderValue::from_str(s) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = s, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Build the CORS layer
///
/// `*` allows every origin but no credentials. Any other value is treated as
/// an origin list and enables credentials for those origins only.
pub fn setup_cors(config: &CorsConfig) -> CorsLayer {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            ORIGIN,
            HeaderName::from_static("x-requested-with"),
            request_id.clone(),
        ])
        .expose_headers([request_id]);

    if config.allowed_origins.trim() == "*" {
        return layer.allow_origin(AllowOrigin::any());
    }
    layer
        .allow_origin(AllowOrigin::list(parse_origins(&config.allowed_origins)))
        .allow_credentials(true)
}
