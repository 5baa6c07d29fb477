// ABOUTME: Single-use token model for sign-in nonces, refresh tokens and OAuth state
// ABOUTME: Only the SHA-256 hash of a token is persisted
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of single-use token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthTokenType {
    /// Sign-in nonce
    Nonce,
    /// Session refresh token
    Refresh,
    /// OAuth authorization state
    OAuthState,
}

string_enum!(AuthTokenType, "token type", {
    Nonce => "nonce",
    Refresh => "refresh",
    OAuthState => "oauth_state",
});

/// Stored single-use token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    /// Row id
    pub id: Uuid,
    /// Owning user, if the token is bound to one
    pub user_id: Option<Uuid>,
    /// Kind of token
    pub token_type: AuthTokenType,
    /// SHA-256 hex of the token value
    pub token_hash: String,
    /// Extra data (OAuth platform, PKCE verifier)
    pub payload: Option<Value>,
    /// Expiry
    pub expires_at: DateTime<Utc>,
    /// When the token was used
    pub consumed_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
