// ABOUTME: Neynar signer creation, registration, status refresh and local revocation
// ABOUTME: A signer uuid stays bound to the first user that registered it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::database::{Database, SignerRepository, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::external::SignerInfo;
use crate::models::{AuthProvider, NeynarSigner, SignerStatus};
use crate::resources::ServerResources;

fn signer_from_info(user_id: Uuid, info: SignerInfo, now: DateTime<Utc>) -> NeynarSigner {
    NeynarSigner {
        id: Uuid::new_v4(),
        user_id,
        signer_uuid: info.signer_uuid,
        public_key: info.public_key,
        fid: info.fid,
        status: info.status,
        approval_url: info.approval_url,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

async fn store_signer(database: &Database, signer: &NeynarSigner) -> AppResult<NeynarSigner> {
    database
        .upsert_signer(signer)
        .await?
        .ok_or_else(|| AppError::conflict("Signer is linked to another account"))
}

/// The user's own active signer, or not found
async fn owned_signer(
    database: &Database,
    user_id: Uuid,
    signer_uuid: &str,
) -> AppResult<NeynarSigner> {
    database
        .get_signer_by_uuid(signer_uuid)
        .await?
        .filter(|s| s.user_id == user_id && s.deleted_at.is_none())
        .ok_or_else(|| AppError::not_found("Signer"))
}

async fn farcaster_fid(database: &Database, user_id: Uuid) -> AppResult<Option<i64>> {
    Ok(database
        .get_auth_profile_for_user(user_id, AuthProvider::Farcaster)
        .await?
        .and_then(|p| p.provider_user_id.parse().ok()))
}

/// Create a new Neynar-managed signer awaiting the user's approval
///
/// # Errors
///
/// Returns external errors from Neynar and database errors
pub async fn create_signer(
    resources: &ServerResources,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<NeynarSigner> {
    let info = resources.neynar.create_signer().await?;
    let signer = store_signer(&resources.database, &signer_from_info(user_id, info, now)).await?;
    info!(user.id = %user_id, signer_uuid = %signer.signer_uuid, "Created Neynar signer");
    Ok(signer)
}

/// Register a signer the client obtained through Sign In With Neynar
///
/// # Errors
///
/// Returns not found if Neynar does not know the signer, permission denied if
/// it belongs to a different fid, and a conflict if another user registered it
pub async fn register_signer(
    resources: &ServerResources,
    user_id: Uuid,
    signer_uuid: &str,
    now: DateTime<Utc>,
) -> AppResult<NeynarSigner> {
    let signer_uuid = signer_uuid.trim();
    if signer_uuid.is_empty() {
        return Err(AppError::invalid_input("signer_uuid is required"));
    }
    let database = &resources.database;

    if let Some(existing) = database.get_signer_by_uuid(signer_uuid).await? {
        if existing.user_id != user_id {
            return Err(AppError::conflict("Signer is linked to another account"));
        }
    }

    let info = resources
        .neynar
        .lookup_signer(signer_uuid)
        .await?
        .ok_or_else(|| AppError::not_found("Signer"))?;

    if let Some(signer_fid) = info.fid {
        let user_fid = farcaster_fid(database, user_id).await?;
        if user_fid != Some(signer_fid) {
            return Err(AppError::permission_denied(
                "Signer belongs to a different Farcaster account",
            ));
        }
    }

    let signer = store_signer(database, &signer_from_info(user_id, info, now)).await?;
    info!(user.id = %user_id, signer_uuid = %signer.signer_uuid, status = %signer.status, "Registered Neynar signer");
    Ok(signer)
}

/// Re-read a signer's status from Neynar
///
/// # Errors
///
/// Returns not found if the signer is not the user's active signer
pub async fn refresh_signer(
    resources: &ServerResources,
    user_id: Uuid,
    signer_uuid: &str,
    now: DateTime<Utc>,
) -> AppResult<NeynarSigner> {
    let database = &resources.database;
    let mut signer = owned_signer(database, user_id, signer_uuid).await?;

    match resources.neynar.lookup_signer(signer_uuid).await? {
        Some(info) => {
            signer.status = info.status;
            signer.fid = info.fid.or(signer.fid);
            if info.approval_url.is_some() {
                signer.approval_url = info.approval_url;
            }
        }
        None => signer.status = SignerStatus::Revoked,
    }
    signer.updated_at = now;

    database
        .update_signer_status(
            signer.id,
            signer.status,
            signer.fid,
            signer.approval_url.as_deref(),
            now,
        )
        .await?;
    Ok(signer)
}

/// Active signers of a user, newest first
///
/// # Errors
///
/// Returns a database error if the query fails
pub async fn list_signers(database: &Database, user_id: Uuid) -> AppResult<Vec<NeynarSigner>> {
    database.list_signers(user_id).await
}

/// Soft-delete a signer locally; Neynar is not contacted
///
/// # Errors
///
/// Returns not found if the user has no such active signer
pub async fn revoke_signer(
    database: &Database,
    user_id: Uuid,
    signer_uuid: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database
        .soft_delete_signer(user_id, signer_uuid, now)
        .await?
    {
        return Err(AppError::not_found("Signer"));
    }
    info!(user.id = %user_id, signer_uuid, "Revoked Neynar signer");
    Ok(())
}
