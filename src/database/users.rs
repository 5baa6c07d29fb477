// ABOUTME: User and sign-in identity database operations
// ABOUTME: Creates users on first sign-in and keeps provider profile snapshots fresh
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::{fmt_ts, parse_enum, parse_opt_ts, parse_ts, parse_uuid, Database, UserRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{AuthProfile, AuthProvider, ConnectedAccount, NeynarSigner, User};

const USER_COLUMNS: &str = "id, email, username, display_name, avatar_url, bio, timezone, \
                            created_at, updated_at, deleted_at";

const PROFILE_COLUMNS: &str = "id, user_id, provider, provider_user_id, username, display_name, \
                               avatar_url, custody_address, created_at, updated_at";

impl Database {
    pub(super) async fn migrate_users(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE COLLATE NOCASE,
                username TEXT,
                display_name TEXT,
                avatar_url TEXT,
                bio TEXT,
                timezone TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            r"
            CREATE TABLE IF NOT EXISTS auth_profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                provider TEXT NOT NULL,
                provider_user_id TEXT NOT NULL,
                username TEXT,
                display_name TEXT,
                avatar_url TEXT,
                custody_address TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (provider, provider_user_id)
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_auth_profiles_user ON auth_profiles(user_id)",
        ])
        .await
    }

    /// Find the active user behind `snapshot` or create one, then point the
    /// identity at that user. `bio` only seeds a newly created user.
    async fn find_or_create_on(
        conn: &mut SqliteConnection,
        snapshot: &AuthProfile,
        bio: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<(User, bool)> {
        let existing_user_id: Option<String> = sqlx::query_scalar(
            r"
            SELECT u.id FROM auth_profiles p
            JOIN users u ON u.id = p.user_id
            WHERE p.provider = $1 AND p.provider_user_id = $2 AND u.deleted_at IS NULL
            ",
        )
        .bind(snapshot.provider.as_str())
        .bind(&snapshot.provider_user_id)
        .fetch_optional(&mut *conn)
        .await?;

        let (user_id, created) = if let Some(id) = existing_user_id {
            (parse_uuid(&id)?, false)
        } else {
            let mut user = User::new(now);
            user.username.clone_from(&snapshot.username);
            user.display_name.clone_from(&snapshot.display_name);
            user.avatar_url.clone_from(&snapshot.avatar_url);
            user.bio = bio.map(str::to_owned);
            sqlx::query(
                r"
                INSERT INTO users (id, username, display_name, avatar_url, bio,
                                   created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                ",
            )
            .bind(user.id.to_string())
            .bind(&user.username)
            .bind(&user.display_name)
            .bind(&user.avatar_url)
            .bind(&user.bio)
            .bind(fmt_ts(&now))
            .execute(&mut *conn)
            .await?;
            (user.id, true)
        };

        // An identity left behind by a deleted user moves to the new user
        sqlx::query(
            r"
            INSERT INTO auth_profiles (id, user_id, provider, provider_user_id, username,
                                       display_name, avatar_url, custody_address,
                                       created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (provider, provider_user_id) DO UPDATE SET
                user_id = excluded.user_id,
                username = excluded.username,
                display_name = excluded.display_name,
                avatar_url = excluded.avatar_url,
                custody_address = excluded.custody_address,
                updated_at = excluded.updated_at
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(snapshot.provider.as_str())
        .bind(&snapshot.provider_user_id)
        .bind(&snapshot.username)
        .bind(&snapshot.display_name)
        .bind(&snapshot.avatar_url)
        .bind(&snapshot.custody_address)
        .bind(fmt_ts(&now))
        .execute(&mut *conn)
        .await?;

        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id.to_string())
            .fetch_one(&mut *conn)
            .await?;
        Ok((Self::row_to_user(&row)?, created))
    }

    fn row_to_user(row: &SqliteRow) -> AppResult<User> {
        Ok(User {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            email: row.get("email"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            avatar_url: row.get("avatar_url"),
            bio: row.get("bio"),
            timezone: row.get("timezone"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }

    fn row_to_auth_profile(row: &SqliteRow) -> AppResult<AuthProfile> {
        Ok(AuthProfile {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            provider: parse_enum(&row.get::<String, _>("provider"))?,
            provider_user_id: row.get("provider_user_id"),
            username: row.get("username"),
            display_name: row.get("display_name"),
            avatar_url: row.get("avatar_url"),
            custody_address: row.get("custody_address"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
        })
    }
}

#[async_trait]
impl UserRepository for Database {
    async fn create_user(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO users (id, email, username, display_name, avatar_url, bio, timezone,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .bind(&user.timezone)
        .bind(fmt_ts(&user.created_at))
        .bind(fmt_ts(&user.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.code == crate::errors::ErrorCode::ResourceAlreadyExists => {
                AppError::already_exists("Email is already in use")
            }
            err => err,
        })?;
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_user).transpose()
    }

    async fn update_user(&self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                email = $2,
                username = $3,
                display_name = $4,
                avatar_url = $5,
                bio = $6,
                timezone = $7,
                updated_at = $8
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.avatar_url)
        .bind(&user.bio)
        .bind(&user.timezone)
        .bind(fmt_ts(&user.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    async fn soft_delete_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Release the email so it can be registered again
        let result = sqlx::query(
            r"
            UPDATE users SET deleted_at = $2, updated_at = $2, email = NULL
            WHERE id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r"
            UPDATE neynar_signers SET deleted_at = $2, updated_at = $2
            WHERE user_id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn get_auth_profile_for_user(
        &self,
        user_id: Uuid,
        provider: AuthProvider,
    ) -> AppResult<Option<AuthProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM auth_profiles WHERE user_id = $1 AND provider = $2 \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .bind(user_id.to_string())
        .bind(provider.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_auth_profile).transpose()
    }

    async fn find_or_create_by_auth_profile(
        &self,
        snapshot: &AuthProfile,
        now: DateTime<Utc>,
    ) -> AppResult<(User, bool)> {
        let mut tx = self.pool.begin().await?;
        let found = Self::find_or_create_on(&mut *tx, snapshot, None, now).await?;
        tx.commit().await?;
        Ok(found)
    }

    async fn reconcile_farcaster_sign_in(
        &self,
        snapshot: &AuthProfile,
        bio: Option<&str>,
        signer: &NeynarSigner,
        account: &ConnectedAccount,
        now: DateTime<Utc>,
    ) -> AppResult<Option<(User, bool)>> {
        let mut tx = self.pool.begin().await?;
        let (user, created) = Self::find_or_create_on(&mut *tx, snapshot, bio, now).await?;

        let signer = NeynarSigner {
            user_id: user.id,
            ..signer.clone()
        };
        if Self::upsert_signer_on(&mut *tx, &signer).await?.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        let account = ConnectedAccount {
            user_id: user.id,
            ..account.clone()
        };
        Self::upsert_account_on(&mut *tx, &account).await?;

        tx.commit().await?;
        Ok(Some((user, created)))
    }
}
