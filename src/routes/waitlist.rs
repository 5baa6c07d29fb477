// ABOUTME: Public waitlist signup and count endpoints
// ABOUTME: Joining twice with the same email returns the existing entry with 200
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::database::now;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::services::waitlist::{self as waitlist_service, JoinWaitlistRequest};

/// Waitlist routes; no authentication required
pub struct WaitlistRoutes;

impl WaitlistRoutes {
    /// Create all waitlist routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/waitlist", post(Self::handle_join))
            .route("/api/waitlist/count", get(Self::handle_count))
            .with_state(resources)
    }

    async fn handle_join(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<JoinWaitlistRequest>,
    ) -> Result<Response, AppError> {
        let (entry, created) = waitlist_service::join(&resources.database, request, now()).await?;
        let status = if created {
            StatusCode::CREATED
        } else {
            StatusCode::OK
        };
        Ok((status, Json(entry)).into_response())
    }

    async fn handle_count(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let count = waitlist_service::count(&resources.database).await?;
        Ok((StatusCode::OK, Json(json!({ "count": count }))).into_response())
    }
}
