// ABOUTME: Platform publishers that deliver a post to Farcaster, X and LinkedIn
// ABOUTME: Each publisher returns the external id and URL of the created post
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Publishers
//!
//! Every target platform implements [`SocialPublisher`]. [`publisher_for`]
//! resolves the credentials a platform needs (the user's latest approved
//! Neynar signer, or a fresh OAuth access token for the linked account) and
//! returns a ready-to-use publisher.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::accounts::access_token_for;
use crate::database::{AccountRepository, SignerRepository};
use crate::errors::{AppError, AppResult};
use crate::external::NeynarClient;
use crate::models::{ConnectedAccount, PostPlatform, SocialPlatform};
use crate::resources::ServerResources;

const X_POST_URL_PREFIX: &str = "https://x.com/i/web/status/";
const LINKEDIN_POST_URL_PREFIX: &str = "https://www.linkedin.com/feed/update/";
const LINKEDIN_RESTLI_ID_HEADER: &str = "x-restli-id";

/// Where a post ended up on a platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPost {
    /// Platform's id for the post
    pub external_id: String,
    /// Public URL of the post
    pub url: String,
}

/// A platform that can receive posts
#[async_trait]
pub trait SocialPublisher: Send + Sync {
    /// Deliver `content` with optional media URLs
    async fn publish(&self, content: &str, media_urls: &[String]) -> AppResult<PublishedPost>;
}

/// Casts through a Neynar-managed signer
pub struct FarcasterPublisher {
    neynar: NeynarClient,
    signer_uuid: String,
}

#[async_trait]
impl SocialPublisher for FarcasterPublisher {
    async fn publish(&self, content: &str, media_urls: &[String]) -> AppResult<PublishedPost> {
        let cast = self
            .neynar
            .publish_cast(&self.signer_uuid, content, media_urls)
            .await?;
        Ok(PublishedPost {
            external_id: cast.hash,
            url: cast.url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

/// Tweets through the X v2 API
pub struct XPublisher {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
}

/// X has no media-by-URL upload, so media links are appended to the text
fn tweet_text(content: &str, media_urls: &[String]) -> String {
    if media_urls.is_empty() {
        return content.to_owned();
    }
    format!("{content}\n\n{}", media_urls.join("\n"))
}

#[async_trait]
impl SocialPublisher for XPublisher {
    async fn publish(&self, content: &str, media_urls: &[String]) -> AppResult<PublishedPost> {
        let response = self
            .http
            .post(format!("{}/2/tweets", self.api_base_url.trim_end_matches('/')))
            .bearer_auth(&self.access_token)
            .json(&json!({ "text": tweet_text(content, media_urls) }))
            .send()
            .await?;

        let response = check_status(SocialPlatform::X, response).await?;
        let created: CreateTweetResponse = response.json().await?;
        Ok(PublishedPost {
            url: format!("{X_POST_URL_PREFIX}{}", created.data.id),
            external_id: created.data.id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UgcPostResponse {
    id: Option<String>,
}

/// Shares through the LinkedIn UGC posts API
pub struct LinkedInPublisher {
    http: reqwest::Client,
    api_base_url: String,
    access_token: String,
    member_id: String,
}

fn ugc_post_body(member_id: &str, content: &str, media_urls: &[String]) -> serde_json::Value {
    let media: Vec<_> = media_urls
        .iter()
        .map(|url| json!({ "status": "READY", "originalUrl": url }))
        .collect();
    let category = if media.is_empty() { "NONE" } else { "ARTICLE" };
    json!({
        "author": format!("urn:li:person:{member_id}"),
        "lifecycleState": "PUBLISHED",
        "specificContent": {
            "com.linkedin.ugc.ShareContent": {
                "shareCommentary": { "text": content },
                "shareMediaCategory": category,
                "media": media,
            }
        },
        "visibility": { "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC" }
    })
}

fn restli_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(LINKEDIN_RESTLI_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(ToOwned::to_owned)
}

#[async_trait]
impl SocialPublisher for LinkedInPublisher {
    async fn publish(&self, content: &str, media_urls: &[String]) -> AppResult<PublishedPost> {
        let response = self
            .http
            .post(format!("{}/v2/ugcPosts", self.api_base_url.trim_end_matches('/')))
            .bearer_auth(&self.access_token)
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&ugc_post_body(&self.member_id, content, media_urls))
            .send()
            .await?;

        let response = check_status(SocialPlatform::LinkedIn, response).await?;
        let header_id = restli_id(response.headers());
        let body_id = response
            .json::<UgcPostResponse>()
            .await
            .ok()
            .and_then(|body| body.id);
        let external_id = body_id.or(header_id).ok_or_else(|| {
            AppError::external_service(
                SocialPlatform::LinkedIn.to_string(),
                "response did not include a post id",
            )
        })?;

        Ok(PublishedPost {
            url: format!("{LINKEDIN_POST_URL_PREFIX}{external_id}"),
            external_id,
        })
    }
}

async fn check_status(
    platform: SocialPlatform,
    response: reqwest::Response,
) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = format!("HTTP {status}: {body}");
    if matches!(status.as_u16(), 401 | 403) {
        Err(AppError::external_auth_failed(platform.to_string(), message))
    } else {
        Err(AppError::external_service(platform.to_string(), message))
    }
}

async fn linked_account(
    resources: &ServerResources,
    user_id: Uuid,
    target: &PostPlatform,
) -> AppResult<ConnectedAccount> {
    let database = &resources.database;
    let account = match target.connected_account_id {
        Some(account_id) => database.get_account(user_id, account_id).await?,
        None => None,
    };
    let account = match account {
        Some(account) => Some(account),
        None => {
            database
                .get_active_account_for_platform(user_id, target.platform)
                .await?
        }
    };
    account.ok_or_else(|| {
        AppError::external_auth_failed(
            target.platform.to_string(),
            "No connected account; link the account again",
        )
    })
}

fn api_base_url(resources: &ServerResources, platform: SocialPlatform) -> AppResult<String> {
    resources
        .config
        .oauth
        .provider(platform)
        .map(|p| p.api_base_url.clone())
        .ok_or_else(|| AppError::config(format!("{platform} is not an OAuth platform")))
}

/// Build the publisher for one delivery row, resolving its credentials
///
/// # Errors
///
/// Returns an error when the user has no approved signer (Farcaster) or no
/// usable linked account (X, LinkedIn)
pub async fn publisher_for(
    resources: &ServerResources,
    user_id: Uuid,
    target: &PostPlatform,
    now: DateTime<Utc>,
) -> AppResult<Box<dyn SocialPublisher>> {
    match target.platform {
        SocialPlatform::Farcaster => {
            let signer = resources
                .database
                .latest_approved_signer(user_id)
                .await?
                .ok_or_else(|| {
                    AppError::external_auth_failed(
                        SocialPlatform::Farcaster.to_string(),
                        "No approved Neynar signer",
                    )
                })?;
            Ok(Box::new(FarcasterPublisher {
                neynar: resources.neynar.clone(),
                signer_uuid: signer.signer_uuid,
            }))
        }
        SocialPlatform::X => {
            let account = linked_account(resources, user_id, target).await?;
            Ok(Box::new(XPublisher {
                http: resources.http_client.clone(),
                api_base_url: api_base_url(resources, SocialPlatform::X)?,
                access_token: access_token_for(resources, &account, now).await?,
            }))
        }
        SocialPlatform::LinkedIn => {
            let account = linked_account(resources, user_id, target).await?;
            Ok(Box::new(LinkedInPublisher {
                http: resources.http_client.clone(),
                api_base_url: api_base_url(resources, SocialPlatform::LinkedIn)?,
                access_token: access_token_for(resources, &account, now).await?,
                member_id: account.platform_user_id,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_tweet_text_appends_media_links() {
        assert_eq!(tweet_text("hello", &[]), "hello");
        let media = vec!["https://cdn.example.com/a.png".to_owned()];
        assert_eq!(
            tweet_text("hello", &media),
            "hello\n\nhttps://cdn.example.com/a.png"
        );
    }

    #[test]
    fn test_ugc_post_body_shape() {
        let body = ugc_post_body("abc123", "Morning run done", &[]);
        assert_eq!(body["author"], "urn:li:person:abc123");
        let share = &body["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(share["shareCommentary"]["text"], "Morning run done");
        assert_eq!(share["shareMediaCategory"], "NONE");

        let with_media = ugc_post_body("abc123", "x", &["https://a.example/b".to_owned()]);
        let share = &with_media["specificContent"]["com.linkedin.ugc.ShareContent"];
        assert_eq!(share["shareMediaCategory"], "ARTICLE");
        assert_eq!(share["media"][0]["originalUrl"], "https://a.example/b");
    }

    #[test]
    fn test_restli_id_header() {
        let mut headers = HeaderMap::new();
        assert!(restli_id(&headers).is_none());
        headers.insert(
            LINKEDIN_RESTLI_ID_HEADER,
            HeaderValue::from_static("urn:li:share:7001"),
        );
        assert_eq!(restli_id(&headers).as_deref(), Some("urn:li:share:7001"));
    }
}
