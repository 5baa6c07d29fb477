// ABOUTME: Public waitlist sign-up and head count
// ABOUTME: Joining is idempotent per email and links an existing user with that email
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use nora_core::constants::limits::MAX_NAME_LENGTH;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::validation::{check_max_len, normalize_email, normalize_optional};
use crate::database::{Database, UserRepository, WaitlistRepository};
use crate::errors::AppResult;
use crate::models::WaitlistEntry;

/// Waitlist sign-up body
#[derive(Debug, Clone, Deserialize)]
pub struct JoinWaitlistRequest {
    /// Contact email
    pub email: String,
    /// Where the visitor came from
    pub source: Option<String>,
    /// Referral code they were given
    pub referral_code: Option<String>,
}

/// Add an email to the waitlist; returns the stored entry and whether it is new
///
/// # Errors
///
/// Returns invalid input for a malformed email and database errors
pub async fn join(
    database: &Database,
    request: JoinWaitlistRequest,
    now: DateTime<Utc>,
) -> AppResult<(WaitlistEntry, bool)> {
    let email = normalize_email(&request.email)?;
    let source = normalize_optional(request.source);
    check_max_len("Source", source.as_deref(), MAX_NAME_LENGTH)?;
    let referral_code = normalize_optional(request.referral_code);
    check_max_len("Referral code", referral_code.as_deref(), MAX_NAME_LENGTH)?;

    let user_id = database.get_user_by_email(&email).await?.map(|u| u.id);
    let (entry, created) = database
        .join_waitlist(&WaitlistEntry {
            id: Uuid::new_v4(),
            email,
            source,
            referral_code,
            user_id,
            created_at: now,
        })
        .await?;

    if created {
        info!(waitlist.id = %entry.id, linked_user = entry.user_id.is_some(), "Waitlist entry created");
    }
    Ok((entry, created))
}

/// Number of waitlist entries
///
/// # Errors
///
/// Returns a database error if the count fails
pub async fn count(database: &Database) -> AppResult<i64> {
    database.count_waitlist_entries().await
}
