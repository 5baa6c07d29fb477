// ABOUTME: Route handlers for linking X and LinkedIn accounts over OAuth 2.0
// ABOUTME: The callback finishes the link and redirects to the web app when one is configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get},
    Json, Router,
};
use serde_json::json;

use super::{authenticate, parse_id};
use crate::database::now;
use crate::errors::AppError;
use crate::models::SocialPlatform;
use crate::resources::ServerResources;
use crate::services::accounts::{self as account_service, OAuthCallbackParams};

/// Connected account routes
pub struct AccountRoutes;

impl AccountRoutes {
    /// Create all connected account routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/accounts", get(Self::handle_list_accounts))
            .route("/api/accounts/:id", delete(Self::handle_unlink))
            .route("/api/accounts/:id/authorize", get(Self::handle_authorize))
            .route("/api/accounts/:id/callback", get(Self::handle_callback))
            .with_state(resources)
    }

    async fn handle_list_accounts(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let accounts = account_service::list_accounts(&resources.database, auth.user_id).await?;
        Ok((StatusCode::OK, Json(json!({ "accounts": accounts }))).into_response())
    }

    async fn handle_unlink(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let account_id = parse_id(&id, "account")?;
        account_service::unlink(&resources.database, auth.user_id, account_id, now()).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_authorize(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(platform): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let platform = SocialPlatform::from_str(&platform)?;
        let request = account_service::begin_link(&resources, auth.user_id, platform, now()).await?;
        Ok((StatusCode::OK, Json(request)).into_response())
    }

    /// Provider redirect target; the user is identified by the stored state
    async fn handle_callback(
        State(resources): State<Arc<ServerResources>>,
        Path(platform): Path<String>,
        Query(params): Query<OAuthCallbackParams>,
    ) -> Result<Response, AppError> {
        let platform = SocialPlatform::from_str(&platform)?;
        let result = account_service::complete_link(&resources, platform, params, now()).await;

        let Some(frontend_url) = resources.config.frontend_url.as_deref() else {
            let account = result?;
            return Ok((StatusCode::OK, Json(account)).into_response());
        };

        let base = frontend_url.trim_end_matches('/');
        let target = match result {
            Ok(account) => format!(
                "{base}/settings/accounts?linked={platform}&account_id={}",
                account.id
            ),
            Err(e) => format!(
                "{base}/settings/accounts?error={}&platform={platform}",
                urlencoding::encode(&e.message)
            ),
        };
        Ok(Redirect::to(&target).into_response())
    }
}
