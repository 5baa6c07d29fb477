// ABOUTME: Marketing waitlist database operations
// ABOUTME: Joining is idempotent per normalized email
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{fmt_ts, parse_opt_uuid, parse_ts, parse_uuid, Database, WaitlistRepository};
use crate::errors::AppResult;
use crate::models::WaitlistEntry;

impl Database {
    pub(super) async fn migrate_waitlist(&self) -> AppResult<()> {
        self.execute_all(&[r"
            CREATE TABLE IF NOT EXISTS waitlist_entries (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                source TEXT,
                referral_code TEXT,
                user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
                created_at TEXT NOT NULL
            )
            "])
        .await
    }

    fn row_to_waitlist_entry(row: &SqliteRow) -> AppResult<WaitlistEntry> {
        Ok(WaitlistEntry {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            email: row.get("email"),
            source: row.get("source"),
            referral_code: row.get("referral_code"),
            user_id: parse_opt_uuid(row.get("user_id"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
        })
    }
}

#[async_trait]
impl WaitlistRepository for Database {
    async fn join_waitlist(&self, entry: &WaitlistEntry) -> AppResult<(WaitlistEntry, bool)> {
        let inserted = sqlx::query(
            r"
            INSERT INTO waitlist_entries (id, email, source, referral_code, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (email) DO NOTHING
            ",
        )
        .bind(entry.id.to_string())
        .bind(&entry.email)
        .bind(&entry.source)
        .bind(&entry.referral_code)
        .bind(entry.user_id.map(|id| id.to_string()))
        .bind(fmt_ts(&entry.created_at))
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;

        let row = sqlx::query(
            r"
            SELECT id, email, source, referral_code, user_id, created_at
            FROM waitlist_entries WHERE email = $1
            ",
        )
        .bind(&entry.email)
        .fetch_one(&self.pool)
        .await?;
        Ok((Self::row_to_waitlist_entry(&row)?, inserted))
    }

    async fn count_waitlist_entries(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waitlist_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
