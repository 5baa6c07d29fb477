// ABOUTME: Route handlers for the signed-in user's profile
// ABOUTME: Read, edit and delete the current account
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use super::authenticate;
use crate::database::now;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::services::users::{self as user_service, UpdateProfileRequest};

/// Current user routes
pub struct UserRoutes;

impl UserRoutes {
    /// Create all user routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/users/me",
                get(Self::handle_get_me)
                    .patch(Self::handle_update_me)
                    .delete(Self::handle_delete_me),
            )
            .with_state(resources)
    }

    async fn handle_get_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let profile = user_service::get_me(&resources.database, auth.user_id).await?;
        Ok((StatusCode::OK, Json(profile)).into_response())
    }

    async fn handle_update_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<UpdateProfileRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let user =
            user_service::update_profile(&resources.database, auth.user_id, request, now()).await?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    async fn handle_delete_me(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        user_service::delete_account(&resources.database, auth.user_id, now()).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
