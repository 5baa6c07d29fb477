// ABOUTME: Connected social account models and the stored OAuth grant
// ABOUTME: One active account per user per platform identity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Social platform a post can be published to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    /// Farcaster through Neynar
    Farcaster,
    /// X (Twitter)
    X,
    /// `LinkedIn`
    #[serde(rename = "linkedin")]
    LinkedIn,
}

string_enum!(SocialPlatform, "platform", {
    Farcaster => "farcaster",
    X => "x",
    LinkedIn => "linkedin",
});

impl SocialPlatform {
    /// Whether accounts on this platform are linked through OAuth 2.0
    #[must_use]
    pub const fn uses_oauth(self) -> bool {
        matches!(self, Self::X | Self::LinkedIn)
    }

    /// Whether the authorization request uses PKCE
    #[must_use]
    pub const fn uses_pkce(self) -> bool {
        matches!(self, Self::X)
    }
}

/// Social account linked to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectedAccount {
    /// Unique account id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Platform
    pub platform: SocialPlatform,
    /// User id on the platform (fid for Farcaster)
    pub platform_user_id: String,
    /// Handle on the platform
    pub username: Option<String>,
    /// Display name on the platform
    pub display_name: Option<String>,
    /// Avatar URL on the platform
    pub avatar_url: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// OAuth grant for a connected account; token fields hold ciphertext
#[derive(Clone, PartialEq, Eq)]
pub struct StoredOAuthToken {
    /// Account the grant belongs to
    pub connected_account_id: Uuid,
    /// Encrypted access token
    pub access_token: String,
    /// Encrypted refresh token
    pub refresh_token: Option<String>,
    /// Token type reported by the provider
    pub token_type: String,
    /// Granted scopes
    pub scope: Option<String>,
    /// Access token expiry
    pub expires_at: Option<DateTime<Utc>>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for StoredOAuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredOAuthToken")
            .field("connected_account_id", &self.connected_account_id)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
