// ABOUTME: Social post models with per-platform delivery state
// ABOUTME: A post targets one or more platforms and aggregates their outcomes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SocialPlatform;

/// Overall post status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Editable, not yet published
    Draft,
    /// Published on every target
    Published,
    /// Published on some targets
    PartiallyPublished,
    /// Publishing failed on every target
    Failed,
}

string_enum!(PostStatus, "post status", {
    Draft => "draft",
    Published => "published",
    PartiallyPublished => "partially_published",
    Failed => "failed",
});

impl PostStatus {
    /// Whether `publish` may run for a post in this status
    #[must_use]
    pub const fn is_publishable(self) -> bool {
        !matches!(self, Self::Published)
    }

    /// Aggregate per-platform outcomes
    #[must_use]
    pub fn from_outcomes(published: usize, total: usize) -> Self {
        match published {
            0 => Self::Failed,
            n if n == total => Self::Published,
            _ => Self::PartiallyPublished,
        }
    }
}

/// Delivery status on one platform
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlatformPostStatus {
    /// Not attempted yet
    Pending,
    /// Delivered
    Published,
    /// Last attempt failed
    Failed,
}

string_enum!(PlatformPostStatus, "platform post status", {
    Pending => "pending",
    Published => "published",
    Failed => "failed",
});

/// Post authored by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Unique post id
    pub id: Uuid,
    /// Author
    pub user_id: Uuid,
    /// Text content
    pub content: String,
    /// Attached media URLs
    pub media_urls: Vec<String>,
    /// Aggregate status
    pub status: PostStatus,
    /// First time any target was published
    pub published_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Delivery state per target platform
    pub platforms: Vec<PostPlatform>,
}

/// Delivery of a post to one platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostPlatform {
    /// Row id
    pub id: Uuid,
    /// Post
    pub post_id: Uuid,
    /// Target platform
    pub platform: SocialPlatform,
    /// Account used for delivery
    pub connected_account_id: Option<Uuid>,
    /// Delivery status
    pub status: PlatformPostStatus,
    /// Id assigned by the platform
    pub external_post_id: Option<String>,
    /// Public URL on the platform
    pub external_url: Option<String>,
    /// Last delivery error
    pub error_message: Option<String>,
    /// Delivery time
    pub published_at: Option<DateTime<Utc>>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}
