// ABOUTME: Connected social account and OAuth grant database operations
// ABOUTME: Re-linking the same platform identity restores the soft-deleted account row
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{
    fmt_opt_ts, fmt_ts, parse_enum, parse_opt_ts, parse_ts, parse_uuid, AccountRepository,
    Database,
};
use crate::errors::AppResult;
use crate::models::{ConnectedAccount, SocialPlatform, StoredOAuthToken};

const ACCOUNT_COLUMNS: &str = "id, user_id, platform, platform_user_id, username, display_name, \
                               avatar_url, created_at, updated_at, deleted_at";

impl Database {
    pub(super) async fn migrate_accounts(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS connected_accounts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                platform TEXT NOT NULL,
                platform_user_id TEXT NOT NULL,
                username TEXT,
                display_name TEXT,
                avatar_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_connected_accounts_active_identity
            ON connected_accounts(user_id, platform, platform_user_id)
            WHERE deleted_at IS NULL
            ",
            r"
            CREATE TABLE IF NOT EXISTS oauth_tokens (
                connected_account_id TEXT PRIMARY KEY
                    REFERENCES connected_accounts(id) ON DELETE CASCADE,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                token_type TEXT NOT NULL DEFAULT 'Bearer',
                scope TEXT,
                expires_at TEXT,
                updated_at TEXT NOT NULL
            )
            ",
        ])
        .await
    }

    /// Insert an account or restore and refresh the matching row on `conn`
    pub(super) async fn upsert_account_on(
        conn: &mut SqliteConnection,
        account: &ConnectedAccount,
    ) -> AppResult<ConnectedAccount> {
        // Prefer the active row, else the most recently deleted one
        let existing_id: Option<String> = sqlx::query_scalar(
            r"
            SELECT id FROM connected_accounts
            WHERE user_id = $1 AND platform = $2 AND platform_user_id = $3
            ORDER BY deleted_at IS NOT NULL, updated_at DESC
            LIMIT 1
            ",
        )
        .bind(account.user_id.to_string())
        .bind(account.platform.as_str())
        .bind(&account.platform_user_id)
        .fetch_optional(&mut *conn)
        .await?;

        let id = if let Some(id) = existing_id {
            sqlx::query(
                r"
                UPDATE connected_accounts SET
                    username = $2,
                    display_name = $3,
                    avatar_url = $4,
                    updated_at = $5,
                    deleted_at = NULL
                WHERE id = $1
                ",
            )
            .bind(&id)
            .bind(&account.username)
            .bind(&account.display_name)
            .bind(&account.avatar_url)
            .bind(fmt_ts(&account.updated_at))
            .execute(&mut *conn)
            .await?;
            id
        } else {
            sqlx::query(
                r"
                INSERT INTO connected_accounts (id, user_id, platform, platform_user_id, username,
                                                display_name, avatar_url, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(account.id.to_string())
            .bind(account.user_id.to_string())
            .bind(account.platform.as_str())
            .bind(&account.platform_user_id)
            .bind(&account.username)
            .bind(&account.display_name)
            .bind(&account.avatar_url)
            .bind(fmt_ts(&account.created_at))
            .bind(fmt_ts(&account.updated_at))
            .execute(&mut *conn)
            .await?;
            account.id.to_string()
        };

        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts WHERE id = $1"
        ))
        .bind(&id)
        .fetch_one(&mut *conn)
        .await?;
        Self::row_to_account(&row)
    }

    fn row_to_account(row: &SqliteRow) -> AppResult<ConnectedAccount> {
        Ok(ConnectedAccount {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            platform: parse_enum(&row.get::<String, _>("platform"))?,
            platform_user_id: row.get("platform_user_id"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            avatar_url: row.get("avatar_url"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }
}

#[async_trait]
impl AccountRepository for Database {
    async fn get_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> AppResult<Option<ConnectedAccount>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(account_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn list_accounts(&self, user_id: Uuid) -> AppResult<Vec<ConnectedAccount>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts \
             WHERE user_id = $1 AND deleted_at IS NULL ORDER BY created_at ASC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_account).collect()
    }

    async fn get_active_account_for_platform(
        &self,
        user_id: Uuid,
        platform: SocialPlatform,
    ) -> AppResult<Option<ConnectedAccount>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM connected_accounts \
             WHERE user_id = $1 AND platform = $2 AND deleted_at IS NULL \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(user_id.to_string())
        .bind(platform.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_account).transpose()
    }

    async fn upsert_account(&self, account: &ConnectedAccount) -> AppResult<ConnectedAccount> {
        let mut tx = self.pool.begin().await?;
        let stored = Self::upsert_account_on(&mut *tx, account).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn soft_delete_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"
            UPDATE connected_accounts SET deleted_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(account_id.to_string())
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() > 0 {
            sqlx::query("DELETE FROM oauth_tokens WHERE connected_account_id = $1")
                .bind(account_id.to_string())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_oauth_token(&self, token: &StoredOAuthToken) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO oauth_tokens (connected_account_id, access_token, refresh_token,
                                      token_type, scope, expires_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (connected_account_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = COALESCE(excluded.refresh_token, oauth_tokens.refresh_token),
                token_type = excluded.token_type,
                scope = COALESCE(excluded.scope, oauth_tokens.scope),
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(token.connected_account_id.to_string())
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.token_type)
        .bind(&token.scope)
        .bind(fmt_opt_ts(token.expires_at.as_ref()))
        .bind(fmt_ts(&token.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_oauth_token(&self, account_id: Uuid) -> AppResult<Option<StoredOAuthToken>> {
        let row = sqlx::query(
            r"
            SELECT connected_account_id, access_token, refresh_token, token_type, scope,
                   expires_at, updated_at
            FROM oauth_tokens WHERE connected_account_id = $1
            ",
        )
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(StoredOAuthToken {
                connected_account_id: parse_uuid(&row.get::<String, _>("connected_account_id"))?,
                access_token: row.get("access_token"),
                refresh_token: row.get("refresh_token"),
                token_type: row.get("token_type"),
                scope: row.get("scope"),
                expires_at: parse_opt_ts(row.get("expires_at"))?,
                updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            })
        })
        .transpose()
    }
}
