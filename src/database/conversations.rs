// ABOUTME: Coaching conversation database operations
// ABOUTME: Messages are persisted as a JSON array alongside the thread
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{
    fmt_ts, from_json, parse_opt_ts, parse_ts, parse_uuid, push_cursor_filter, push_page_order,
    to_json, ConversationRepository, Database,
};
use crate::errors::{AppError, AppResult};
use crate::models::AgentConversation;
use crate::pagination::{Cursor, CursorPage, PaginationParams};

const CONVERSATION_COLUMNS: &str =
    "id, user_id, title, messages, created_at, updated_at, deleted_at";

impl Database {
    pub(super) async fn migrate_conversations(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS agent_conversations (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                title TEXT,
                messages TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_agent_conversations_user_created ON agent_conversations(user_id, created_at DESC, id DESC)",
        ])
        .await
    }

    fn row_to_conversation(row: &SqliteRow) -> AppResult<AgentConversation> {
        Ok(AgentConversation {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            title: row.get("title"),
            messages: from_json(&row.get::<String, _>("messages"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }
}

#[async_trait]
impl ConversationRepository for Database {
    async fn create_conversation(&self, conversation: &AgentConversation) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO agent_conversations (id, user_id, title, messages, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(&conversation.title)
        .bind(to_json(&conversation.messages)?)
        .bind(fmt_ts(&conversation.created_at))
        .bind(fmt_ts(&conversation.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Option<AgentConversation>> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM agent_conversations \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(conversation_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_conversation).transpose()
    }

    async fn list_conversations(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<AgentConversation>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {CONVERSATION_COLUMNS} FROM agent_conversations WHERE user_id = "
        ));
        qb.push_bind(user_id.to_string())
            .push(" AND deleted_at IS NULL");
        push_cursor_filter(&mut qb, params)?;
        push_page_order(&mut qb, params);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let conversations = rows
            .iter()
            .map(Self::row_to_conversation)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(CursorPage::from_lookahead(
            conversations,
            params.limit,
            |c: &AgentConversation| Cursor::new(c.created_at, &c.id.to_string()),
        ))
    }

    async fn update_conversation(&self, conversation: &AgentConversation) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE agent_conversations SET title = $3, messages = $4, updated_at = $5
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(conversation.id.to_string())
        .bind(conversation.user_id.to_string())
        .bind(&conversation.title)
        .bind(to_json(&conversation.messages)?)
        .bind(fmt_ts(&conversation.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Conversation"));
        }
        Ok(())
    }

    async fn soft_delete_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE agent_conversations SET deleted_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(conversation_id.to_string())
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
