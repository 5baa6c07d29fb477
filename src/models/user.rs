// ABOUTME: User account and external sign-in identity models
// ABOUTME: A user owns one auth profile per sign-in provider identity
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user id
    pub id: Uuid,
    /// Email, unique across users when present
    pub email: Option<String>,
    /// Handle shown in the apps
    pub username: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// Avatar image URL
    pub avatar_url: Option<String>,
    /// Short biography
    pub bio: Option<String>,
    /// IANA timezone name
    pub timezone: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// New, empty user
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: None,
            username: None,
            display_name: None,
            avatar_url: None,
            bio: None,
            timezone: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Sign-in provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// Sign In With Farcaster; the provider user id is the fid
    Farcaster,
}

string_enum!(AuthProvider, "auth provider", { Farcaster => "farcaster" });

/// Identity snapshot from a sign-in provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthProfile {
    /// Unique profile id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Provider
    pub provider: AuthProvider,
    /// User id at the provider
    pub provider_user_id: String,
    /// Provider handle
    pub username: Option<String>,
    /// Provider display name
    pub display_name: Option<String>,
    /// Provider avatar URL
    pub avatar_url: Option<String>,
    /// Ethereum custody address (Farcaster)
    pub custody_address: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last refresh of the snapshot
    pub updated_at: DateTime<Utc>,
}
