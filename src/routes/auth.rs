// ABOUTME: Route handlers for Farcaster sign-in, session refresh and logout
// ABOUTME: Sessions are returned in the body and mirrored into an HttpOnly cookie
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::now;
use crate::errors::{AppError, AppResult};
use crate::middleware::auth::AUTH_COOKIE;
use crate::models::User;
use crate::resources::ServerResources;
use crate::services::auth::{self as auth_service, FarcasterSignInRequest, SessionTokens};

/// Body of refresh and logout requests
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token from the last session
    pub refresh_token: String,
}

/// Successful sign-in response
#[derive(Debug, Serialize)]
pub struct SignInResponse {
    /// Issued tokens
    #[serde(flatten)]
    pub session: SessionTokens,
    /// Signed-in user
    pub user: User,
    /// Whether this sign-in created the user
    pub is_new_user: bool,
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/auth/nonce", post(Self::handle_nonce))
            .route("/api/auth/farcaster", post(Self::handle_farcaster))
            .route("/api/auth/refresh", post(Self::handle_refresh))
            .route("/api/auth/logout", post(Self::handle_logout))
            .with_state(resources)
    }

    fn session_cookie(
        resources: &ServerResources,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<HeaderValue> {
        let max_age = (expires_at - Utc::now()).num_seconds().max(0);
        let secure = if resources.config.environment.is_production() {
            "; Secure"
        } else {
            ""
        };
        HeaderValue::from_str(&format!(
            "{AUTH_COOKIE}={token}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}"
        ))
        .map_err(|e| AppError::internal(format!("Invalid session cookie: {e}")))
    }

    fn cleared_cookie() -> HeaderValue {
        HeaderValue::from_static("auth_token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
    }

    async fn handle_nonce(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let nonce = auth_service::create_nonce(&resources.database, now()).await?;
        Ok((StatusCode::OK, Json(nonce)).into_response())
    }

    async fn handle_farcaster(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<FarcasterSignInRequest>,
    ) -> Result<Response, AppError> {
        let outcome = auth_service::sign_in_with_farcaster(&resources, &request, now()).await?;
        let cookie = Self::session_cookie(
            &resources,
            &outcome.session.access_token,
            outcome.session.expires_at,
        )?;
        let body = SignInResponse {
            session: outcome.session,
            user: outcome.user,
            is_new_user: outcome.is_new_user,
        };
        Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(body)).into_response())
    }

    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RefreshRequest>,
    ) -> Result<Response, AppError> {
        let session = auth_service::refresh_session(&resources, &request.refresh_token, now()).await?;
        let cookie = Self::session_cookie(&resources, &session.access_token, session.expires_at)?;
        Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(session)).into_response())
    }

    async fn handle_logout(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RefreshRequest>,
    ) -> Result<Response, AppError> {
        auth_service::logout(&resources.database, &request.refresh_token, now()).await?;
        Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, Self::cleared_cookie())]).into_response())
    }
}
