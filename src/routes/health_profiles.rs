// ABOUTME: Route handlers for the caller's health profile
// ABOUTME: PUT replaces the profile; GET includes BMI, BMR and TDEE
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
use crate::services::health::{self as health_service, HealthProfileInput};

/// Health profile routes
pub struct HealthProfileRoutes;

impl HealthProfileRoutes {
    /// Create all health profile routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/health-profile",
                get(Self::handle_get_profile)
                    .put(Self::handle_upsert_profile)
                    .delete(Self::handle_delete_profile),
            )
            .with_state(resources)
    }

    async fn handle_get_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let view = health_service::get_profile(&resources.database, auth.user_id).await?;
        Ok((StatusCode::OK, Json(view)).into_response())
    }

    async fn handle_upsert_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(input): Json<HealthProfileInput>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let view =
            health_service::upsert_profile(&resources.database, auth.user_id, input, now()).await?;
        Ok((StatusCode::OK, Json(view)).into_response())
    }

    async fn handle_delete_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        health_service::delete_profile(&resources.database, auth.user_id, now()).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
