// ABOUTME: Farcaster sign-in flow, session issuance, refresh token rotation and logout
// ABOUTME: Nonces and refresh tokens are single use; only their hashes are stored
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Sign-in
//!
//! 1. The client asks for a nonce and embeds it in its sign-in request.
//! 2. The nonce is consumed, the optional SIWF message is checked, and the
//!    Neynar signer is verified to be approved for the claimed fid.
//! 3. The Farcaster profile is fetched and reconciled into a local user,
//!    signer row and connected account within one transaction.
//! 4. A JWT access token and an opaque refresh token are issued.

use chrono::{DateTime, Duration, Utc};
use nora_core::constants::tokens::{
    NONCE_EXPIRY_MINUTES, NONCE_LENGTH, REFRESH_TOKEN_BYTES, REFRESH_TOKEN_EXPIRY_DAYS,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::siwf::SiwfMessage;
use crate::crypto::{generate_alphanumeric, generate_token, hash_token};
use crate::database::{AuthTokenRepository, Database, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{
    AuthProfile, AuthProvider, AuthToken, AuthTokenType, ConnectedAccount, NeynarSigner,
    SignerStatus, SocialPlatform, User,
};
use crate::resources::ServerResources;

/// A freshly issued sign-in nonce
#[derive(Debug, Clone, Serialize)]
pub struct IssuedNonce {
    /// Nonce to embed in the sign-in message
    pub nonce: String,
    /// When the nonce stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Sign-in request body
#[derive(Debug, Clone, Deserialize)]
pub struct FarcasterSignInRequest {
    /// Nonce previously issued by [`create_nonce`]
    pub nonce: String,
    /// Farcaster id claimed by the client
    pub fid: i64,
    /// Neynar signer approved for `fid`
    pub signer_uuid: String,
    /// Optional Sign-In-With-Farcaster message
    #[serde(default)]
    pub message: Option<String>,
}

/// Access and refresh tokens for a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    /// JWT access token
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: &'static str,
    /// Access token expiry
    pub expires_at: DateTime<Utc>,
    /// Opaque refresh token
    pub refresh_token: String,
    /// Refresh token expiry
    pub refresh_expires_at: DateTime<Utc>,
}

/// Result of a successful sign-in
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    /// Issued tokens
    pub session: SessionTokens,
    /// Signed-in user
    pub user: User,
    /// Whether the user was created by this sign-in
    pub is_new_user: bool,
}

/// Issue and store a sign-in nonce
///
/// Expired nonces, refresh tokens and OAuth states are purged first, so the
/// token table is swept whenever a sign-in begins.
///
/// # Errors
///
/// Returns a database error if the nonce cannot be stored
pub async fn create_nonce(database: &Database, now: DateTime<Utc>) -> AppResult<IssuedNonce> {
    match database.delete_expired_tokens(now).await {
        Ok(0) => {}
        Ok(deleted) => debug!(deleted, "Purged expired tokens"),
        Err(e) => warn!(error = %e, "Expired token purge failed"),
    }

    let nonce = generate_alphanumeric(NONCE_LENGTH);
    let expires_at = now + Duration::minutes(NONCE_EXPIRY_MINUTES);
    database
        .store_token(&AuthToken {
            id: Uuid::new_v4(),
            user_id: None,
            token_type: AuthTokenType::Nonce,
            token_hash: hash_token(&nonce),
            payload: None,
            expires_at,
            consumed_at: None,
            created_at: now,
        })
        .await?;
    Ok(IssuedNonce { nonce, expires_at })
}

/// Sign in (or sign up) with a Farcaster identity
///
/// # Errors
///
/// Returns an authentication error when the nonce, message or signer does not
/// check out, and external or database errors from the calls it makes
pub async fn sign_in_with_farcaster(
    resources: &ServerResources,
    request: &FarcasterSignInRequest,
    now: DateTime<Utc>,
) -> AppResult<SignInOutcome> {
    let database = &resources.database;
    let signer_uuid = request.signer_uuid.trim();
    if signer_uuid.is_empty() {
        return Err(AppError::invalid_input("signer_uuid is required"));
    }
    if request.fid <= 0 {
        return Err(AppError::invalid_input("fid must be a positive integer"));
    }

    database
        .consume_token(AuthTokenType::Nonce, &hash_token(request.nonce.trim()), now)
        .await?
        .ok_or_else(|| AppError::auth_invalid("Invalid or expired nonce"))?;

    if let Some(message) = request.message.as_deref() {
        SiwfMessage::parse(message)?.verify(
            resources.neynar.sign_in_domain(),
            request.nonce.trim(),
            request.fid,
            now,
        )?;
    }

    let signer = resources
        .neynar
        .lookup_signer(signer_uuid)
        .await?
        .ok_or_else(|| AppError::auth_invalid("Unknown signer"))?;
    if signer.status != SignerStatus::Approved {
        return Err(AppError::auth_invalid("Signer is not approved"));
    }
    if signer.fid != Some(request.fid) {
        return Err(AppError::auth_invalid("Signer does not belong to this fid"));
    }

    let farcaster_user = resources.neynar.fetch_user(request.fid).await?;
    let snapshot = AuthProfile {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        provider: AuthProvider::Farcaster,
        provider_user_id: request.fid.to_string(),
        username: farcaster_user.username.clone(),
        display_name: farcaster_user.display_name.clone(),
        avatar_url: farcaster_user.pfp_url.clone(),
        custody_address: farcaster_user.custody_address.clone(),
        created_at: now,
        updated_at: now,
    };
    let reconciled = database
        .reconcile_farcaster_sign_in(
            &snapshot,
            farcaster_user.bio.as_deref(),
            &NeynarSigner {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                signer_uuid: signer.signer_uuid,
                public_key: signer.public_key,
                fid: Some(request.fid),
                status: SignerStatus::Approved,
                approval_url: signer.approval_url,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
            &ConnectedAccount {
                id: Uuid::new_v4(),
                user_id: Uuid::nil(),
                platform: SocialPlatform::Farcaster,
                platform_user_id: request.fid.to_string(),
                username: farcaster_user.username,
                display_name: farcaster_user.display_name,
                avatar_url: farcaster_user.pfp_url,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
            now,
        )
        .await?;
    let Some((user, is_new_user)) = reconciled else {
        warn!(fid = request.fid, signer_uuid, "Signer is registered to another user");
        return Err(AppError::conflict("Signer is linked to another account"));
    };

    let session = issue_session(resources, user.id, Some(request.fid), now).await?;

    AppLogger::log_auth_event(
        &user.id.to_string(),
        "farcaster_sign_in",
        true,
        Some(if is_new_user { "new user" } else { "returning user" }),
    );
    info!(user.id = %user.id, fid = request.fid, is_new_user, "User signed in with Farcaster");

    Ok(SignInOutcome {
        session,
        user,
        is_new_user,
    })
}

/// Issue an access token and a stored refresh token
///
/// # Errors
///
/// Returns an error if token encoding or storage fails
pub async fn issue_session(
    resources: &ServerResources,
    user_id: Uuid,
    fid: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<SessionTokens> {
    let access = resources.auth_manager.generate_token(user_id, fid)?;
    let refresh_token = generate_token(REFRESH_TOKEN_BYTES);
    let refresh_expires_at = now + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);

    resources
        .database
        .store_token(&AuthToken {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            token_type: AuthTokenType::Refresh,
            token_hash: hash_token(&refresh_token),
            payload: Some(json!({ "fid": fid })),
            expires_at: refresh_expires_at,
            consumed_at: None,
            created_at: now,
        })
        .await?;

    Ok(SessionTokens {
        access_token: access.token,
        token_type: "Bearer",
        expires_at: access.expires_at,
        refresh_token,
        refresh_expires_at,
    })
}

/// Exchange a refresh token for a new session, consuming the old token
///
/// # Errors
///
/// Returns an authentication error if the token is unknown, expired, already
/// used, or its user no longer exists
pub async fn refresh_session(
    resources: &ServerResources,
    refresh_token: &str,
    now: DateTime<Utc>,
) -> AppResult<SessionTokens> {
    let consumed = resources
        .database
        .consume_token(AuthTokenType::Refresh, &hash_token(refresh_token.trim()), now)
        .await?
        .ok_or_else(|| AppError::auth_invalid("Invalid or expired refresh token"))?;

    let user_id = consumed
        .user_id
        .ok_or_else(|| AppError::auth_invalid("Refresh token has no user"))?;
    if resources.database.get_user(user_id).await?.is_none() {
        return Err(AppError::auth_invalid("User no longer exists"));
    }

    let fid = consumed
        .payload
        .as_ref()
        .and_then(|p| p.get("fid"))
        .and_then(serde_json::Value::as_i64);

    AppLogger::log_auth_event(&user_id.to_string(), "session_refresh", true, None);
    issue_session(resources, user_id, fid, now).await
}

/// Consume a refresh token; unknown or used tokens are ignored
///
/// # Errors
///
/// Returns a database error if the token cannot be updated
pub async fn logout(database: &Database, refresh_token: &str, now: DateTime<Utc>) -> AppResult<()> {
    if let Some(token) = database
        .consume_token(AuthTokenType::Refresh, &hash_token(refresh_token.trim()), now)
        .await?
    {
        if let Some(user_id) = token.user_id {
            AppLogger::log_auth_event(&user_id.to_string(), "logout", true, None);
        }
    }
    Ok(())
}
