// ABOUTME: Neynar v2 REST client for Farcaster signers, user profiles and casts
// ABOUTME: Authenticates with the x-api-key header; base URL is configurable
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! Neynar API Client
//!
//! Neynar manages Farcaster signers on behalf of the application and relays
//! casts. Only the four endpoints the server needs are wrapped here.
//!
//! # API Reference
//! <https://docs.neynar.com/reference>

use nora_core::constants::service_names::NEYNAR;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::environment::NeynarConfig;
use crate::errors::{AppError, AppResult};
use crate::models::SignerStatus;

/// Signer as reported by Neynar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    /// Neynar signer id
    pub signer_uuid: String,
    /// Ed25519 public key, hex encoded
    pub public_key: String,
    /// Approval state
    pub status: SignerStatus,
    /// Fid the signer is approved for, once approved
    pub fid: Option<i64>,
    /// Deep link the user follows to approve the signer
    pub approval_url: Option<String>,
}

/// Farcaster user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarcasterUser {
    /// Farcaster id
    pub fid: i64,
    /// Handle
    pub username: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// Profile picture URL
    pub pfp_url: Option<String>,
    /// Custody address
    pub custody_address: Option<String>,
    /// Profile bio
    pub bio: Option<String>,
}

/// Result of publishing a cast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastResult {
    /// Cast hash
    pub hash: String,
    /// Public URL of the cast
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SignerResponse {
    signer_uuid: String,
    public_key: String,
    status: String,
    fid: Option<i64>,
    signer_approval_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BulkUsersResponse {
    users: Vec<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    fid: i64,
    username: Option<String>,
    display_name: Option<String>,
    pfp_url: Option<String>,
    custody_address: Option<String>,
    profile: Option<UserProfileResponse>,
}

#[derive(Debug, Deserialize)]
struct UserProfileResponse {
    bio: Option<BioResponse>,
}

#[derive(Debug, Deserialize)]
struct BioResponse {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct PublishCastRequest<'a> {
    signer_uuid: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct PublishCastResponse {
    cast: CastResponse,
}

#[derive(Debug, Deserialize)]
struct CastResponse {
    hash: String,
    author: Option<CastAuthor>,
}

#[derive(Debug, Deserialize)]
struct CastAuthor {
    username: Option<String>,
}

impl TryFrom<SignerResponse> for SignerInfo {
    type Error = AppError;

    fn try_from(response: SignerResponse) -> AppResult<Self> {
        let status = response.status.parse::<SignerStatus>().map_err(|_| {
            AppError::external_service(
                NEYNAR,
                format!("Unknown signer status '{}'", response.status),
            )
        })?;
        Ok(Self {
            signer_uuid: response.signer_uuid,
            public_key: response.public_key,
            status,
            fid: response.fid,
            approval_url: response.signer_approval_url,
        })
    }
}

impl From<UserResponse> for FarcasterUser {
    fn from(user: UserResponse) -> Self {
        Self {
            fid: user.fid,
            username: user.username,
            display_name: user.display_name,
            pfp_url: user.pfp_url,
            custody_address: user.custody_address,
            bio: user.profile.and_then(|p| p.bio).and_then(|b| b.text),
        }
    }
}

/// Neynar v2 API client
#[derive(Debug, Clone)]
pub struct NeynarClient {
    config: NeynarConfig,
    http_client: reqwest::Client,
}

impl NeynarClient {
    /// Create a client over a shared HTTP client
    #[must_use]
    pub const fn new(config: NeynarConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    /// Domain sign-in messages must be issued for
    #[must_use]
    pub fn sign_in_domain(&self) -> &str {
        &self.config.sign_in_domain
    }

    fn api_key(&self) -> AppResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::config("NEYNAR_API_KEY is not configured"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    async fn check_status(response: Response) -> AppResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Err(AppError::external_auth_failed(
                NEYNAR,
                format!("HTTP {status}: {body}"),
            ));
        }
        Err(AppError::external_service(
            NEYNAR,
            format!("HTTP {status}: {body}"),
        ))
    }

    /// Look up a signer; `None` when Neynar does not know it
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the request fails
    pub async fn lookup_signer(&self, signer_uuid: &str) -> AppResult<Option<SignerInfo>> {
        let response = self
            .http_client
            .get(self.url("/v2/farcaster/signer"))
            .header("x-api-key", self.api_key()?)
            .query(&[("signer_uuid", signer_uuid)])
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST
        ) {
            debug!(signer_uuid, "Neynar does not know signer");
            return Ok(None);
        }

        let signer: SignerResponse = Self::check_status(response).await?.json().await?;
        signer.try_into().map(Some)
    }

    /// Create a new managed signer awaiting approval
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the request fails
    pub async fn create_signer(&self) -> AppResult<SignerInfo> {
        let response = self
            .http_client
            .post(self.url("/v2/farcaster/signer"))
            .header("x-api-key", self.api_key()?)
            .send()
            .await?;

        let signer: SignerResponse = Self::check_status(response).await?.json().await?;
        signer.try_into()
    }

    /// Fetch a Farcaster user profile
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Neynar returns no user for the fid
    pub async fn fetch_user(&self, fid: i64) -> AppResult<FarcasterUser> {
        let response = self
            .http_client
            .get(self.url("/v2/farcaster/user/bulk"))
            .header("x-api-key", self.api_key()?)
            .query(&[("fids", fid.to_string())])
            .send()
            .await?;

        let bulk: BulkUsersResponse = Self::check_status(response).await?.json().await?;
        bulk.users
            .into_iter()
            .find(|u| u.fid == fid)
            .map(FarcasterUser::from)
            .ok_or_else(|| AppError::not_found(format!("Farcaster user {fid}")))
    }

    /// Publish a cast through an approved signer
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or Neynar rejects the cast
    pub async fn publish_cast(
        &self,
        signer_uuid: &str,
        text: &str,
        embeds: &[String],
    ) -> AppResult<CastResult> {
        let request = PublishCastRequest {
            signer_uuid,
            text,
            embeds: embeds.iter().map(|url| EmbedRequest { url }).collect(),
        };
        let response = self
            .http_client
            .post(self.url("/v2/farcaster/cast"))
            .header("x-api-key", self.api_key()?)
            .json(&request)
            .send()
            .await?;

        let published: PublishCastResponse = Self::check_status(response).await?.json().await?;
        let hash = published.cast.hash;
        let url = match published.cast.author.and_then(|a| a.username) {
            Some(username) => format!("https://warpcast.com/{username}/{hash}"),
            None => format!("https://warpcast.com/~/conversations/{hash}"),
        };
        Ok(CastResult { hash, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signer_response_status_parsing() {
        let response = SignerResponse {
            signer_uuid: "abc".to_owned(),
            public_key: "0x01".to_owned(),
            status: "pending_approval".to_owned(),
            fid: None,
            signer_approval_url: Some("https://client.warpcast.com/deeplinks/signed-key-request?token=t".to_owned()),
        };
        let info = SignerInfo::try_from(response).unwrap();
        assert_eq!(info.status, SignerStatus::PendingApproval);

        let bad = SignerResponse {
            signer_uuid: "abc".to_owned(),
            public_key: "0x01".to_owned(),
            status: "mystery".to_owned(),
            fid: None,
            signer_approval_url: None,
        };
        assert!(SignerInfo::try_from(bad).is_err());
    }

    #[test]
    fn test_user_bio_flattened() {
        let json = serde_json::json!({
            "fid": 3,
            "username": "dwr",
            "display_name": "Dan",
            "pfp_url": "https://example.com/p.png",
            "custody_address": "0xabc",
            "profile": { "bio": { "text": "building" } }
        });
        let user: UserResponse = serde_json::from_value(json).unwrap();
        let user = FarcasterUser::from(user);
        assert_eq!(user.bio.as_deref(), Some("building"));
        assert_eq!(user.username.as_deref(), Some("dwr"));
    }
}
