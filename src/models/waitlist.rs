// ABOUTME: Marketing waitlist entry model
// ABOUTME: Emails are stored normalized (trimmed, lowercase) and unique
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Person waiting for access
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitlistEntry {
    /// Row id
    pub id: Uuid,
    /// Normalized email
    pub email: String,
    /// Where the sign-up came from (landing page, mini-app, ...)
    pub source: Option<String>,
    /// Referral code entered at sign-up
    pub referral_code: Option<String>,
    /// Registered user with the same email
    pub user_id: Option<Uuid>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
