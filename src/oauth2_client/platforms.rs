// ABOUTME: Reads the authorizing user's identity from X and LinkedIn
// ABOUTME: Normalizes both APIs into a single platform profile shape
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::models::SocialPlatform;

/// Identity of the account that granted access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    /// User id on the platform
    pub platform_user_id: String,
    /// Handle
    pub username: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    /// Avatar URL
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XUserEnvelope {
    data: XUser,
}

#[derive(Debug, Deserialize)]
struct XUser {
    id: String,
    name: Option<String>,
    username: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkedInUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

impl From<XUserEnvelope> for PlatformProfile {
    fn from(envelope: XUserEnvelope) -> Self {
        let user = envelope.data;
        Self {
            platform_user_id: user.id,
            username: user.username,
            display_name: user.name,
            avatar_url: user.profile_image_url,
        }
    }
}

impl From<LinkedInUserInfo> for PlatformProfile {
    fn from(info: LinkedInUserInfo) -> Self {
        Self {
            platform_user_id: info.sub,
            username: info.email,
            display_name: info.name,
            avatar_url: info.picture,
        }
    }
}

/// Fetch the profile of the user an access token belongs to
///
/// # Errors
///
/// Returns an error for Farcaster (not an OAuth platform), on HTTP failure,
/// or when the platform rejects the token
pub async fn fetch_platform_profile(
    http: &reqwest::Client,
    platform: SocialPlatform,
    api_base_url: &str,
    access_token: &str,
) -> AppResult<PlatformProfile> {
    let base = api_base_url.trim_end_matches('/');
    let request = match platform {
        SocialPlatform::X => http
            .get(format!("{base}/2/users/me"))
            .query(&[("user.fields", "profile_image_url")]),
        SocialPlatform::LinkedIn => http.get(format!("{base}/v2/userinfo")),
        SocialPlatform::Farcaster => {
            return Err(AppError::invalid_input(
                "Farcaster accounts are linked through sign-in",
            ))
        }
    };

    let response = request.bearer_auth(access_token).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::external_auth_failed(
            platform.to_string(),
            format!("profile lookup returned HTTP {status}: {body}"),
        ));
    }

    let profile = match platform {
        SocialPlatform::X => response.json::<XUserEnvelope>().await?.into(),
        _ => response.json::<LinkedInUserInfo>().await?.into(),
    };
    Ok(profile)
}
