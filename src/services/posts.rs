// ABOUTME: Post authoring, history and multi-platform publishing
// ABOUTME: Publish outcomes are recorded per platform and aggregated into the post status
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use nora_core::constants::limits::{MAX_CAST_BYTES, MAX_POST_LENGTH, MAX_POST_MEDIA};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::publishers::{publisher_for, PublishedPost};
use super::validation::{require_text, validate_http_url};
use crate::database::{AccountRepository, Database, PostRepository};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{PlatformPostStatus, Post, PostPlatform, PostStatus, SocialPlatform};
use crate::pagination::{CursorPage, PaginationParams};
use crate::resources::ServerResources;

/// New post body
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePostRequest {
    /// Post text
    pub content: String,
    /// Attached media URLs
    #[serde(default)]
    pub media_urls: Vec<String>,
    /// Target platforms
    pub platforms: Vec<SocialPlatform>,
}

/// Draft edits; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePostRequest {
    /// Post text
    pub content: Option<String>,
    /// Attached media URLs
    pub media_urls: Option<Vec<String>>,
    /// Target platforms
    pub platforms: Option<Vec<SocialPlatform>>,
}

fn validate_content(content: &str) -> AppResult<String> {
    require_text("Content", content, MAX_POST_LENGTH)
}

/// Casts are limited in bytes, not characters
fn check_cast_size(content: &str, platforms: &[SocialPlatform]) -> AppResult<()> {
    if platforms.contains(&SocialPlatform::Farcaster) && content.len() > MAX_CAST_BYTES {
        return Err(AppError::invalid_input(format!(
            "Content exceeds the Farcaster limit of {MAX_CAST_BYTES} bytes"
        )));
    }
    Ok(())
}

fn validate_media(media_urls: Vec<String>) -> AppResult<Vec<String>> {
    if media_urls.len() > MAX_POST_MEDIA {
        return Err(AppError::invalid_input(format!(
            "A post can have at most {MAX_POST_MEDIA} media URLs"
        )));
    }
    media_urls
        .iter()
        .map(|url| validate_http_url("Media URL", url))
        .collect()
}

fn distinct_platforms(platforms: Vec<SocialPlatform>) -> AppResult<Vec<SocialPlatform>> {
    let mut seen = HashSet::new();
    let platforms: Vec<_> = platforms.into_iter().filter(|p| seen.insert(*p)).collect();
    if platforms.is_empty() {
        return Err(AppError::invalid_input(
            "At least one target platform is required",
        ));
    }
    Ok(platforms)
}

/// Build pending delivery rows; OAuth platforms need an active linked account
async fn delivery_rows(
    database: &Database,
    user_id: Uuid,
    post_id: Uuid,
    platforms: &[SocialPlatform],
    now: DateTime<Utc>,
) -> AppResult<Vec<PostPlatform>> {
    let mut rows = Vec::with_capacity(platforms.len());
    for &platform in platforms {
        let connected_account_id = if platform.uses_oauth() {
            let account = database
                .get_active_account_for_platform(user_id, platform)
                .await?
                .ok_or_else(|| {
                    AppError::invalid_input(format!("No connected {platform} account"))
                })?;
            Some(account.id)
        } else {
            None
        };
        rows.push(PostPlatform {
            id: Uuid::new_v4(),
            post_id,
            platform,
            connected_account_id,
            status: PlatformPostStatus::Pending,
            external_post_id: None,
            external_url: None,
            error_message: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        });
    }
    Ok(rows)
}

/// Create a draft post targeting one or more platforms
///
/// # Errors
///
/// Returns invalid input for bad content, media or platforms, including a
/// target platform the user has not linked
pub async fn create_post(
    database: &Database,
    user_id: Uuid,
    request: CreatePostRequest,
    now: DateTime<Utc>,
) -> AppResult<Post> {
    let content = validate_content(&request.content)?;
    let media_urls = validate_media(request.media_urls)?;
    let platforms = distinct_platforms(request.platforms)?;
    check_cast_size(&content, &platforms)?;

    let post_id = Uuid::new_v4();
    let post = Post {
        id: post_id,
        user_id,
        content,
        media_urls,
        status: PostStatus::Draft,
        published_at: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
        platforms: delivery_rows(database, user_id, post_id, &platforms, now).await?,
    };
    database.create_post(&post).await?;
    info!(user.id = %user_id, post.id = %post.id, targets = post.platforms.len(), "Post created");
    Ok(post)
}

/// Active post owned by the user
///
/// # Errors
///
/// Returns not found if the post does not exist, was deleted, or is not the user's
pub async fn get_post(database: &Database, user_id: Uuid, post_id: Uuid) -> AppResult<Post> {
    database
        .get_post(user_id, post_id)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))
}

/// Active posts, newest first
///
/// # Errors
///
/// Returns invalid input for a malformed cursor and database errors
pub async fn list_posts(
    database: &Database,
    user_id: Uuid,
    status: Option<PostStatus>,
    params: &PaginationParams,
) -> AppResult<CursorPage<Post>> {
    database.list_posts(user_id, status, false, params).await
}

/// All posts including deleted ones, newest first
///
/// # Errors
///
/// Returns invalid input for a malformed cursor and database errors
pub async fn list_post_history(
    database: &Database,
    user_id: Uuid,
    params: &PaginationParams,
) -> AppResult<CursorPage<Post>> {
    database.list_posts(user_id, None, true, params).await
}

/// Edit a draft
///
/// # Errors
///
/// Returns a conflict if the post is no longer a draft and invalid input for
/// bad fields
pub async fn update_post(
    database: &Database,
    user_id: Uuid,
    post_id: Uuid,
    request: UpdatePostRequest,
    now: DateTime<Utc>,
) -> AppResult<Post> {
    let mut post = get_post(database, user_id, post_id).await?;
    if post.status != PostStatus::Draft {
        return Err(AppError::conflict("Only draft posts can be edited"));
    }

    if let Some(content) = request.content {
        post.content = validate_content(&content)?;
    }
    if let Some(media_urls) = request.media_urls {
        post.media_urls = validate_media(media_urls)?;
    }
    let replace_platforms = match request.platforms {
        Some(platforms) => {
            let platforms = distinct_platforms(platforms)?;
            post.platforms = delivery_rows(database, user_id, post.id, &platforms, now).await?;
            true
        }
        None => false,
    };
    let targets: Vec<_> = post.platforms.iter().map(|p| p.platform).collect();
    check_cast_size(&post.content, &targets)?;
    post.updated_at = now;

    database.update_post(&post, replace_platforms).await?;
    Ok(post)
}

/// Soft-delete a post
///
/// # Errors
///
/// Returns not found if the user has no such active post
pub async fn delete_post(
    database: &Database,
    user_id: Uuid,
    post_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database.soft_delete_post(user_id, post_id, now).await? {
        return Err(AppError::not_found("Post"));
    }
    info!(user.id = %user_id, post.id = %post_id, "Post deleted");
    Ok(())
}

async fn deliver(
    resources: &ServerResources,
    post: &Post,
    target: &PostPlatform,
    now: DateTime<Utc>,
) -> AppResult<PublishedPost> {
    let publisher = publisher_for(resources, post.user_id, target, now).await?;
    publisher.publish(&post.content, &post.media_urls).await
}

/// Deliver a post to every platform it has not reached yet
///
/// Per-platform failures are recorded on the delivery rows rather than
/// returned as errors.
///
/// # Errors
///
/// Returns not found for an unknown post, a conflict if it is already fully
/// published, and database errors
pub async fn publish_post(
    resources: &ServerResources,
    user_id: Uuid,
    post_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Post> {
    let database = &resources.database;
    let mut post = get_post(database, user_id, post_id).await?;
    if !post.status.is_publishable() {
        return Err(AppError::conflict("Post is already published"));
    }

    let mut platforms = std::mem::take(&mut post.platforms);
    for target in platforms
        .iter_mut()
        .filter(|t| t.status != PlatformPostStatus::Published)
    {
        match deliver(resources, &post, target, now).await {
            Ok(published) => {
                target.status = PlatformPostStatus::Published;
                target.external_post_id = Some(published.external_id);
                target.external_url = Some(published.url);
                target.error_message = None;
                target.published_at = Some(now);
                AppLogger::log_publish_event(
                    &post.id.to_string(),
                    target.platform.as_str(),
                    true,
                    None,
                );
            }
            Err(error) => {
                warn!(post.id = %post.id, platform = %target.platform, error = %error, "Publish failed");
                target.status = PlatformPostStatus::Failed;
                target.error_message = Some(error.message.clone());
                AppLogger::log_publish_event(
                    &post.id.to_string(),
                    target.platform.as_str(),
                    false,
                    Some(&error.message),
                );
            }
        }
        target.updated_at = now;
        database.update_post_platform(target).await?;
    }
    post.platforms = platforms;

    let published = post
        .platforms
        .iter()
        .filter(|t| t.status == PlatformPostStatus::Published)
        .count();
    post.status = PostStatus::from_outcomes(published, post.platforms.len());
    if published > 0 && post.published_at.is_none() {
        post.published_at = Some(now);
    }
    post.updated_at = now;
    database.update_post(&post, false).await?;

    info!(
        post.id = %post.id,
        status = %post.status,
        published,
        total = post.platforms.len(),
        "Post publish finished"
    );
    Ok(post)
}
