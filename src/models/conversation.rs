// ABOUTME: Coaching conversation threads between a user and the health agent
// ABOUTME: Messages are stored inline as a JSON array on the conversation row
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// The user
    User,
    /// The coaching agent
    Assistant,
    /// System instruction
    System,
}

string_enum!(MessageRole, "message role", {
    User => "user",
    Assistant => "assistant",
    System => "system",
});

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationMessage {
    /// Author
    pub role: MessageRole,
    /// Text
    pub content: String,
    /// When the message was appended
    pub created_at: DateTime<Utc>,
}

/// Conversation thread
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConversation {
    /// Unique conversation id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Title
    pub title: Option<String>,
    /// Messages in order
    pub messages: Vec<ConversationMessage>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}
