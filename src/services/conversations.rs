// ABOUTME: Stored coaching conversation threads and their messages
// ABOUTME: Untitled threads take their title from the first user message
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use nora_core::constants::limits::{MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH};
use serde::Deserialize;
use uuid::Uuid;

use super::validation::{check_max_len, normalize_optional, require_text};
use crate::database::{ConversationRepository, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{AgentConversation, ConversationMessage, MessageRole};
use crate::pagination::{CursorPage, PaginationParams};

const DERIVED_TITLE_CHARS: usize = 60;

/// New conversation body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateConversationRequest {
    /// Thread title
    pub title: Option<String>,
}

/// New message body
#[derive(Debug, Clone, Deserialize)]
pub struct AppendMessageRequest {
    /// Author of the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

fn derived_title(content: &str) -> String {
    let first_line = content.lines().next().unwrap_or_default().trim();
    if first_line.chars().count() <= DERIVED_TITLE_CHARS {
        return first_line.to_owned();
    }
    let truncated: String = first_line.chars().take(DERIVED_TITLE_CHARS).collect();
    format!("{}…", truncated.trim_end())
}

/// Start a conversation
///
/// # Errors
///
/// Returns invalid input for an overlong title
pub async fn create_conversation(
    database: &Database,
    user_id: Uuid,
    request: CreateConversationRequest,
    now: DateTime<Utc>,
) -> AppResult<AgentConversation> {
    let title = normalize_optional(request.title);
    check_max_len("Title", title.as_deref(), MAX_NAME_LENGTH)?;

    let conversation = AgentConversation {
        id: Uuid::new_v4(),
        user_id,
        title,
        messages: Vec::new(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    database.create_conversation(&conversation).await?;
    Ok(conversation)
}

/// Active conversation owned by the user
///
/// # Errors
///
/// Returns not found if the user has no such active conversation
pub async fn get_conversation(
    database: &Database,
    user_id: Uuid,
    conversation_id: Uuid,
) -> AppResult<AgentConversation> {
    database
        .get_conversation(user_id, conversation_id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))
}

/// Page of conversations, newest first
///
/// # Errors
///
/// Returns invalid input for a malformed cursor and database errors
pub async fn list_conversations(
    database: &Database,
    user_id: Uuid,
    params: &PaginationParams,
) -> AppResult<CursorPage<AgentConversation>> {
    database.list_conversations(user_id, params).await
}

/// Append a message to a conversation
///
/// # Errors
///
/// Returns not found for an unknown conversation and invalid input for empty
/// or overlong content
pub async fn append_message(
    database: &Database,
    user_id: Uuid,
    conversation_id: Uuid,
    request: AppendMessageRequest,
    now: DateTime<Utc>,
) -> AppResult<AgentConversation> {
    let content = require_text("Content", &request.content, MAX_MESSAGE_LENGTH)?;
    let mut conversation = get_conversation(database, user_id, conversation_id).await?;

    if conversation.title.is_none() && request.role == MessageRole::User {
        conversation.title = Some(derived_title(&content));
    }
    conversation.messages.push(ConversationMessage {
        role: request.role,
        content,
        created_at: now,
    });
    conversation.updated_at = now;

    database.update_conversation(&conversation).await?;
    Ok(conversation)
}

/// Soft-delete a conversation
///
/// # Errors
///
/// Returns not found if the user has no such active conversation
pub async fn delete_conversation(
    database: &Database,
    user_id: Uuid,
    conversation_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database
        .soft_delete_conversation(user_id, conversation_id, now)
        .await?
    {
        return Err(AppError::not_found("Conversation"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_title() {
        assert_eq!(derived_title("How much protein?"), "How much protein?");
        assert_eq!(derived_title("First line\nsecond line"), "First line");

        let long = "a".repeat(80);
        let title = derived_title(&long);
        assert_eq!(title.chars().count(), DERIVED_TITLE_CHARS + 1);
        assert!(title.ends_with('…'));
    }
}
