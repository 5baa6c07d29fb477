// ABOUTME: Neynar signer database operations
// ABOUTME: A signer uuid belongs to one live user; re-registering restores a revoked row
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{fmt_ts, parse_enum, parse_opt_ts, parse_ts, parse_uuid, Database, SignerRepository};
use crate::errors::AppResult;
use crate::models::{NeynarSigner, SignerStatus};

const SIGNER_COLUMNS: &str = "id, user_id, signer_uuid, public_key, fid, status, approval_url, \
                              created_at, updated_at, deleted_at";

impl Database {
    pub(super) async fn migrate_signers(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS neynar_signers (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                signer_uuid TEXT NOT NULL UNIQUE,
                public_key TEXT NOT NULL,
                fid INTEGER,
                status TEXT NOT NULL
                    CHECK (status IN ('generated', 'pending_approval', 'approved', 'revoked')),
                approval_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_neynar_signers_user ON neynar_signers(user_id, status)",
        ])
        .await
    }

    /// Insert or refresh a signer on `conn`
    ///
    /// Returns `None` when the uuid is held by another active user. A signer
    /// left behind by a deleted user is handed over to `signer.user_id`.
    pub(super) async fn upsert_signer_on(
        conn: &mut SqliteConnection,
        signer: &NeynarSigner,
    ) -> AppResult<Option<NeynarSigner>> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO neynar_signers (id, user_id, signer_uuid, public_key, fid, status,
                                        approval_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (signer_uuid) DO UPDATE SET
                user_id = excluded.user_id,
                public_key = excluded.public_key,
                fid = COALESCE(excluded.fid, neynar_signers.fid),
                status = excluded.status,
                approval_url = COALESCE(excluded.approval_url, neynar_signers.approval_url),
                updated_at = excluded.updated_at,
                deleted_at = NULL
            WHERE neynar_signers.user_id = excluded.user_id
               OR neynar_signers.user_id IN (SELECT id FROM users WHERE deleted_at IS NOT NULL)
            RETURNING {SIGNER_COLUMNS}
            "
        ))
        .bind(signer.id.to_string())
        .bind(signer.user_id.to_string())
        .bind(&signer.signer_uuid)
        .bind(&signer.public_key)
        .bind(signer.fid)
        .bind(signer.status.as_str())
        .bind(&signer.approval_url)
        .bind(fmt_ts(&signer.created_at))
        .bind(fmt_ts(&signer.updated_at))
        .fetch_optional(&mut *conn)
        .await?;
        row.as_ref().map(Self::row_to_signer).transpose()
    }

    fn row_to_signer(row: &SqliteRow) -> AppResult<NeynarSigner> {
        Ok(NeynarSigner {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            signer_uuid: row.get("signer_uuid"),
            public_key: row.get("public_key"),
            fid: row.get("fid"),
            status: parse_enum(&row.get::<String, _>("status"))?,
            approval_url: row.get("approval_url"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }
}

#[async_trait]
impl SignerRepository for Database {
    async fn get_signer_by_uuid(&self, signer_uuid: &str) -> AppResult<Option<NeynarSigner>> {
        let row = sqlx::query(&format!(
            "SELECT {SIGNER_COLUMNS} FROM neynar_signers WHERE signer_uuid = $1"
        ))
        .bind(signer_uuid)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_signer).transpose()
    }

    async fn upsert_signer(&self, signer: &NeynarSigner) -> AppResult<Option<NeynarSigner>> {
        let mut conn = self.pool.acquire().await?;
        Self::upsert_signer_on(&mut *conn, signer).await
    }

    async fn list_signers(&self, user_id: Uuid) -> AppResult<Vec<NeynarSigner>> {
        let rows = sqlx::query(&format!(
            "SELECT {SIGNER_COLUMNS} FROM neynar_signers \
             WHERE user_id = $1 AND deleted_at IS NULL ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_signer).collect()
    }

    async fn latest_approved_signer(&self, user_id: Uuid) -> AppResult<Option<NeynarSigner>> {
        let row = sqlx::query(&format!(
            "SELECT {SIGNER_COLUMNS} FROM neynar_signers \
             WHERE user_id = $1 AND status = 'approved' AND deleted_at IS NULL \
             ORDER BY updated_at DESC, id DESC LIMIT 1"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_signer).transpose()
    }

    async fn update_signer_status(
        &self,
        signer_id: Uuid,
        status: SignerStatus,
        fid: Option<i64>,
        approval_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE neynar_signers SET
                status = $2,
                fid = COALESCE($3, fid),
                approval_url = COALESCE($4, approval_url),
                updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(signer_id.to_string())
        .bind(status.as_str())
        .bind(fid)
        .bind(approval_url)
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn soft_delete_signer(
        &self,
        user_id: Uuid,
        signer_uuid: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE neynar_signers SET deleted_at = $3, updated_at = $3
            WHERE signer_uuid = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(signer_uuid)
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
