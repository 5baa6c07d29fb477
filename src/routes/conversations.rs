// ABOUTME: Route handlers for coaching conversations and their messages
// ABOUTME: Messages are appended in order; the first user message titles the conversation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::{authenticate, parse_id, ListQuery};
use crate::database::now;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::services::conversations::{
    self as conversation_service, AppendMessageRequest, CreateConversationRequest,
};

/// Conversation routes
pub struct ConversationRoutes;

impl ConversationRoutes {
    /// Create all conversation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/conversations",
                get(Self::handle_list_conversations).post(Self::handle_create_conversation),
            )
            .route(
                "/api/conversations/:id",
                get(Self::handle_get_conversation).delete(Self::handle_delete_conversation),
            )
            .route(
                "/api/conversations/:id/messages",
                post(Self::handle_append_message),
            )
            .with_state(resources)
    }

    async fn handle_create_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateConversationRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let conversation = conversation_service::create_conversation(
            &resources.database,
            auth.user_id,
            request,
            now(),
        )
        .await?;
        Ok((StatusCode::CREATED, Json(conversation)).into_response())
    }

    async fn handle_list_conversations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let page = conversation_service::list_conversations(
            &resources.database,
            auth.user_id,
            &query.pagination(),
        )
        .await?;
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    async fn handle_get_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let conversation_id = parse_id(&id, "conversation")?;
        let conversation = conversation_service::get_conversation(
            &resources.database,
            auth.user_id,
            conversation_id,
        )
        .await?;
        Ok((StatusCode::OK, Json(conversation)).into_response())
    }

    async fn handle_append_message(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(request): Json<AppendMessageRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let conversation_id = parse_id(&id, "conversation")?;
        let conversation = conversation_service::append_message(
            &resources.database,
            auth.user_id,
            conversation_id,
            request,
            now(),
        )
        .await?;
        Ok((StatusCode::OK, Json(conversation)).into_response())
    }

    async fn handle_delete_conversation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let conversation_id = parse_id(&id, "conversation")?;
        conversation_service::delete_conversation(
            &resources.database,
            auth.user_id,
            conversation_id,
            now(),
        )
        .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
