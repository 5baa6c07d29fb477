// ABOUTME: Route handlers for Neynar signers used to cast on Farcaster
// ABOUTME: Create, register, refresh, list and revoke the caller's signers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::authenticate;
use crate::database::now;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::services::signers as signer_service;

/// Body of `POST /api/signers/register`
#[derive(Debug, Deserialize)]
pub struct RegisterSignerRequest {
    /// Signer obtained through Sign In With Neynar
    pub signer_uuid: String,
}

/// Signer routes
pub struct SignerRoutes;

impl SignerRoutes {
    /// Create all signer routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/signers",
                get(Self::handle_list_signers).post(Self::handle_create_signer),
            )
            .route("/api/signers/register", post(Self::handle_register_signer))
            .route(
                "/api/signers/:signer_uuid",
                get(Self::handle_refresh_signer).delete(Self::handle_revoke_signer),
            )
            .with_state(resources)
    }

    async fn handle_list_signers(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let signers = signer_service::list_signers(&resources.database, auth.user_id).await?;
        Ok((StatusCode::OK, Json(json!({ "signers": signers }))).into_response())
    }

    async fn handle_create_signer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let signer = signer_service::create_signer(&resources, auth.user_id, now()).await?;
        Ok((StatusCode::CREATED, Json(signer)).into_response())
    }

    async fn handle_register_signer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<RegisterSignerRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let signer =
            signer_service::register_signer(&resources, auth.user_id, &request.signer_uuid, now())
                .await?;
        Ok((StatusCode::OK, Json(signer)).into_response())
    }

    /// Returns the signer with its status re-read from Neynar
    async fn handle_refresh_signer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(signer_uuid): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let signer =
            signer_service::refresh_signer(&resources, auth.user_id, &signer_uuid, now()).await?;
        Ok((StatusCode::OK, Json(signer)).into_response())
    }

    async fn handle_revoke_signer(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(signer_uuid): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        signer_service::revoke_signer(&resources.database, auth.user_id, &signer_uuid, now())
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
