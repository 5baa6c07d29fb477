// ABOUTME: Current-user profile reads, edits and account deletion
// ABOUTME: Deleting an account soft-deletes the user and revokes their refresh tokens
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use nora_core::constants::limits::MAX_NAME_LENGTH;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::validation::{check_max_len, normalize_email, normalize_optional, validate_http_url};
use crate::database::{AuthTokenRepository, Database, UserRepository};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{AuthProfile, AuthProvider, AuthTokenType, User};

const MAX_USERNAME_LENGTH: usize = 50;
const MAX_BIO_LENGTH: usize = 500;
const MAX_TIMEZONE_LENGTH: usize = 64;

/// User with their Farcaster identity
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// The user row
    pub user: User,
    /// Farcaster identity snapshot
    pub farcaster: Option<AuthProfile>,
}

/// Profile edits; absent fields are left unchanged and blank strings clear a field
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// Contact email
    pub email: Option<String>,
    /// Handle
    pub username: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
    /// Short bio
    pub bio: Option<String>,
    /// IANA timezone name
    pub timezone: Option<String>,
}

async fn active_user(database: &Database, user_id: Uuid) -> AppResult<User> {
    database
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

/// Load the signed-in user
///
/// # Errors
///
/// Returns not found if the user was deleted
pub async fn get_me(database: &Database, user_id: Uuid) -> AppResult<UserProfile> {
    let user = active_user(database, user_id).await?;
    let farcaster = database
        .get_auth_profile_for_user(user_id, AuthProvider::Farcaster)
        .await?;
    Ok(UserProfile { user, farcaster })
}

fn validate_username(username: &str) -> AppResult<()> {
    check_max_len("Username", Some(username), MAX_USERNAME_LENGTH)?;
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AppError::invalid_input(
            "Username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(())
}

/// Accepts `UTC` or an `Area/Location` shaped name
///
/// Only the shape is checked; the name is not looked up in the IANA database,
/// so `Foo/Bar` passes.
fn validate_timezone(timezone: &str) -> AppResult<()> {
    check_max_len("Timezone", Some(timezone), MAX_TIMEZONE_LENGTH)?;
    let well_formed = timezone == "UTC"
        || (timezone.contains('/')
            && timezone
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-' | '+')));
    if !well_formed {
        return Err(AppError::invalid_input(format!(
            "Invalid timezone: {timezone} (expected UTC or an Area/Location name)"
        )));
    }
    Ok(())
}

/// Apply profile edits to the signed-in user
///
/// # Errors
///
/// Returns invalid input for malformed fields and a conflict when the email is
/// used by another account
pub async fn update_profile(
    database: &Database,
    user_id: Uuid,
    request: UpdateProfileRequest,
    now: DateTime<Utc>,
) -> AppResult<User> {
    let mut user = active_user(database, user_id).await?;

    if let Some(email) = request.email {
        user.email = match normalize_optional(Some(email)) {
            Some(email) => Some(normalize_email(&email)?),
            None => None,
        };
    }
    if let Some(username) = request.username {
        let username = normalize_optional(Some(username));
        if let Some(u) = username.as_deref() {
            validate_username(u)?;
        }
        user.username = username;
    }
    if let Some(display_name) = request.display_name {
        let display_name = normalize_optional(Some(display_name));
        check_max_len("Display name", display_name.as_deref(), MAX_NAME_LENGTH)?;
        user.display_name = display_name;
    }
    if let Some(avatar_url) = request.avatar_url {
        user.avatar_url = normalize_optional(Some(avatar_url))
            .map(|url| validate_http_url("Avatar URL", &url))
            .transpose()?;
    }
    if let Some(bio) = request.bio {
        let bio = normalize_optional(Some(bio));
        check_max_len("Bio", bio.as_deref(), MAX_BIO_LENGTH)?;
        user.bio = bio;
    }
    if let Some(timezone) = request.timezone {
        let timezone = normalize_optional(Some(timezone));
        if let Some(tz) = timezone.as_deref() {
            validate_timezone(tz)?;
        }
        user.timezone = timezone;
    }

    user.updated_at = now;
    database.update_user(&user).await.map_err(|e| {
        if e.code == ErrorCode::ResourceAlreadyExists {
            AppError::already_exists("Email is already in use")
        } else {
            e
        }
    })?;
    Ok(user)
}

/// Soft-delete the signed-in user, release their signers and revoke every refresh token
///
/// # Errors
///
/// Returns not found if the user was already deleted
pub async fn delete_account(database: &Database, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
    if !database.soft_delete_user(user_id, now).await? {
        return Err(AppError::not_found("User"));
    }
    let revoked = database
        .revoke_user_tokens(user_id, AuthTokenType::Refresh, now)
        .await?;
    info!(user.id = %user_id, revoked, "User account deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("nora_health.v2").is_ok());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_timezone_rules() {
        assert!(validate_timezone("UTC").is_ok());
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("Etc/GMT+5").is_ok());
        assert!(validate_timezone("Mars").is_err());
        assert!(validate_timezone("Europe/Paris; DROP").is_err());
        // Shape only, not a lookup
        assert!(validate_timezone("Foo/Bar").is_ok());
        let err = validate_timezone("Mars").unwrap_err();
        assert!(err.message.contains("Area/Location"));
    }
}
