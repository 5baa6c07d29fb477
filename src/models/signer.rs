// ABOUTME: Neynar-managed Farcaster signer model
// ABOUTME: A signer must be approved before it can publish casts for its fid
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status reported by Neynar
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SignerStatus {
    /// Key pair generated, not yet registered on chain
    Generated,
    /// Waiting for the user to approve in their Farcaster client
    PendingApproval,
    /// Approved and able to publish
    Approved,
    /// Revoked by the user
    Revoked,
}

string_enum!(SignerStatus, "signer status", {
    Generated => "generated",
    PendingApproval => "pending_approval",
    Approved => "approved",
    Revoked => "revoked",
});

/// Signer stored for a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NeynarSigner {
    /// Row id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Neynar signer uuid
    pub signer_uuid: String,
    /// Ed25519 public key, hex
    pub public_key: String,
    /// Farcaster id the signer acts for, once known
    pub fid: Option<i64>,
    /// Status
    pub status: SignerStatus,
    /// Deep link the user opens to approve the signer
    pub approval_url: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}
