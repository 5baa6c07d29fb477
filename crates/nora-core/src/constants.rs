// ABOUTME: Application-wide constants for limits, token lifetimes, and service names
// ABOUTME: Centralizes magic numbers so configuration defaults stay consistent
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

/// Service identifiers used in logs and token audiences
pub mod service_names {
    /// Name of the HTTP server binary
    pub const NORA_HEALTH_SERVER: &str = "nora-health-server";
    /// JWT audience for session tokens
    pub const JWT_AUDIENCE: &str = "nora-health";
    /// Name used for Neynar in error messages
    pub const NEYNAR: &str = "Neynar";
}

/// Token lifetimes
pub mod tokens {
    /// Session (access) JWT lifetime in hours
    pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
    /// Refresh token lifetime in days
    pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 30;
    /// Sign-in nonce lifetime in minutes
    pub const NONCE_EXPIRY_MINUTES: i64 = 10;
    /// OAuth state lifetime in minutes
    pub const OAUTH_STATE_EXPIRY_MINUTES: i64 = 15;
    /// Length of generated sign-in nonces
    pub const NONCE_LENGTH: usize = 24;
    /// Number of random bytes in a refresh token
    pub const REFRESH_TOKEN_BYTES: usize = 32;
    /// Length of the PKCE code verifier
    pub const PKCE_VERIFIER_LENGTH: usize = 64;
    /// Refresh OAuth access tokens this many seconds before they expire
    pub const OAUTH_REFRESH_MARGIN_SECONDS: i64 = 300;
}

/// Request and payload limits
pub mod limits {
    /// Default page size for list endpoints
    pub const DEFAULT_PAGE_SIZE: usize = 20;
    /// Maximum page size for list endpoints
    pub const MAX_PAGE_SIZE: usize = 100;
    /// Maximum post body length in characters
    pub const MAX_POST_LENGTH: usize = 1024;
    /// Maximum UTF-8 size of a Farcaster cast, in bytes
    pub const MAX_CAST_BYTES: usize = 1024;
    /// Maximum number of media attachments per post
    pub const MAX_POST_MEDIA: usize = 4;
    /// Maximum length of short free-text fields (names, titles)
    pub const MAX_NAME_LENGTH: usize = 200;
    /// Maximum length of a single conversation message
    pub const MAX_MESSAGE_LENGTH: usize = 16_000;
    /// Maximum request body size in bytes
    pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;
    /// Request timeout in seconds
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// Outbound HTTP timeout in seconds
    pub const EXTERNAL_HTTP_TIMEOUT_SECS: u64 = 15;
}

/// Health profile validation bounds
pub mod health_bounds {
    /// Minimum supported age in years
    pub const MIN_AGE: i64 = 13;
    /// Maximum supported age in years
    pub const MAX_AGE: i64 = 120;
    /// Minimum height in centimeters
    pub const MIN_HEIGHT_CM: f64 = 50.0;
    /// Maximum height in centimeters
    pub const MAX_HEIGHT_CM: f64 = 272.0;
    /// Minimum weight in kilograms
    pub const MIN_WEIGHT_KG: f64 = 20.0;
    /// Maximum weight in kilograms
    pub const MAX_WEIGHT_KG: f64 = 500.0;
    /// Maximum calories recorded for a single meal
    pub const MAX_MEAL_CALORIES: f64 = 10_000.0;
    /// Maximum workout duration in minutes
    pub const MAX_WORKOUT_MINUTES: i64 = 24 * 60;
}
