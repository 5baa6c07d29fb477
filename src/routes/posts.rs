// ABOUTME: Route handlers for posts, post history and publishing
// ABOUTME: Publishing returns the post with per-platform outcomes even when some fail
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use super::{authenticate, parse_id, ListQuery};
use crate::database::now;
use crate::errors::AppError;
use crate::models::PostStatus;
use crate::resources::ServerResources;
use crate::services::posts::{self as post_service, CreatePostRequest, UpdatePostRequest};

/// `GET /api/posts` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    /// Only posts in this status
    pub status: Option<String>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
    /// Page size
    pub limit: Option<usize>,
}

/// Post routes
pub struct PostRoutes;

impl PostRoutes {
    /// Create all post routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/posts",
                get(Self::handle_list_posts).post(Self::handle_create_post),
            )
            .route("/api/posts/history", get(Self::handle_post_history))
            .route(
                "/api/posts/:id",
                get(Self::handle_get_post)
                    .patch(Self::handle_update_post)
                    .delete(Self::handle_delete_post),
            )
            .route("/api/posts/:id/publish", post(Self::handle_publish_post))
            .with_state(resources)
    }

    async fn handle_create_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreatePostRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let post =
            post_service::create_post(&resources.database, auth.user_id, request, now()).await?;
        Ok((StatusCode::CREATED, Json(post)).into_response())
    }

    async fn handle_list_posts(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListPostsQuery>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let status = query
            .status
            .as_deref()
            .map(PostStatus::from_str)
            .transpose()?;
        let params = ListQuery {
            cursor: query.cursor,
            limit: query.limit,
        }
        .pagination();
        let page =
            post_service::list_posts(&resources.database, auth.user_id, status, &params).await?;
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    async fn handle_post_history(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let page = post_service::list_post_history(
            &resources.database,
            auth.user_id,
            &query.pagination(),
        )
        .await?;
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    async fn handle_get_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let post_id = parse_id(&id, "post")?;
        let post = post_service::get_post(&resources.database, auth.user_id, post_id).await?;
        Ok((StatusCode::OK, Json(post)).into_response())
    }

    async fn handle_update_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(request): Json<UpdatePostRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let post_id = parse_id(&id, "post")?;
        let post =
            post_service::update_post(&resources.database, auth.user_id, post_id, request, now())
                .await?;
        Ok((StatusCode::OK, Json(post)).into_response())
    }

    async fn handle_delete_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let post_id = parse_id(&id, "post")?;
        post_service::delete_post(&resources.database, auth.user_id, post_id, now()).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_publish_post(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let post_id = parse_id(&id, "post")?;
        let post = post_service::publish_post(&resources, auth.user_id, post_id, now()).await?;
        Ok((StatusCode::OK, Json(post)).into_response())
    }
}
