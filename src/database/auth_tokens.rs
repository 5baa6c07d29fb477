// ABOUTME: Storage for single-use hashed tokens (sign-in nonces, refresh tokens, OAuth state)
// ABOUTME: Consumption is one conditional UPDATE so concurrent consumers cannot both win
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{
    fmt_ts, from_json, parse_enum, parse_opt_ts, parse_opt_uuid, parse_ts, parse_uuid, to_json,
    AuthTokenRepository, Database,
};
use crate::errors::AppResult;
use crate::models::{AuthToken, AuthTokenType};

impl Database {
    pub(super) async fn migrate_auth_tokens(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS auth_tokens (
                id TEXT PRIMARY KEY,
                user_id TEXT REFERENCES users(id) ON DELETE CASCADE,
                token_type TEXT NOT NULL CHECK (token_type IN ('nonce', 'refresh', 'oauth_state')),
                token_hash TEXT NOT NULL UNIQUE,
                payload TEXT,
                expires_at TEXT NOT NULL,
                consumed_at TEXT,
                created_at TEXT NOT NULL
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_auth_tokens_user ON auth_tokens(user_id, token_type)",
            "CREATE INDEX IF NOT EXISTS idx_auth_tokens_expires ON auth_tokens(expires_at)",
        ])
        .await
    }

    fn row_to_auth_token(row: &SqliteRow) -> AppResult<AuthToken> {
        let payload: Option<String> = row.get("payload");
        Ok(AuthToken {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_opt_uuid(row.get("user_id"))?,
            token_type: parse_enum(&row.get::<String, _>("token_type"))?,
            token_hash: row.get("token_hash"),
            payload: payload.as_deref().map(from_json).transpose()?,
            expires_at: parse_ts(&row.get::<String, _>("expires_at"))?,
            consumed_at: parse_opt_ts(row.get("consumed_at"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        })
    }
}

#[async_trait]
impl AuthTokenRepository for Database {
    async fn store_token(&self, token: &AuthToken) -> AppResult<()> {
        let payload = token.payload.as_ref().map(to_json).transpose()?;
        sqlx::query(
            r"
            INSERT INTO auth_tokens (id, user_id, token_type, token_hash, payload, expires_at,
                                     created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(token.id.to_string())
        .bind(token.user_id.map(|id| id.to_string()))
        .bind(token.token_type.as_str())
        .bind(&token.token_hash)
        .bind(payload)
        .bind(fmt_ts(&token.expires_at))
        .bind(fmt_ts(&token.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_token(
        &self,
        token_type: AuthTokenType,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AuthToken>> {
        let now = fmt_ts(&now);
        let row = sqlx::query(
            r"
            UPDATE auth_tokens SET consumed_at = $3
            WHERE token_hash = $1
              AND token_type = $2
              AND consumed_at IS NULL
              AND expires_at > $3
            RETURNING id, user_id, token_type, token_hash, payload, expires_at, consumed_at,
                      created_at
            ",
        )
        .bind(token_hash)
        .bind(token_type.as_str())
        .bind(&now)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_auth_token).transpose()
    }

    async fn revoke_user_tokens(
        &self,
        user_id: Uuid,
        token_type: AuthTokenType,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE auth_tokens SET consumed_at = $3
            WHERE user_id = $1 AND token_type = $2 AND consumed_at IS NULL
            ",
        )
        .bind(user_id.to_string())
        .bind(token_type.as_str())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= $1")
            .bind(fmt_ts(&now))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
