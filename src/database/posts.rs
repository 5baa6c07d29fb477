// ABOUTME: Post and per-platform delivery database operations
// ABOUTME: Posts are listed newest first with keyset pagination, optionally including deleted ones
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use uuid::Uuid;

use super::{
    fmt_opt_ts, fmt_ts, from_json, parse_enum, parse_opt_ts, parse_opt_uuid, parse_ts, parse_uuid,
    push_cursor_filter, push_page_order, to_json, Database, PostRepository,
};
use crate::errors::{AppError, AppResult};
use crate::models::{Post, PostPlatform, PostStatus};
use crate::pagination::{Cursor, CursorPage, PaginationParams};

const POST_COLUMNS: &str =
    "id, user_id, content, media_urls, status, published_at, created_at, updated_at, deleted_at";

const PLATFORM_COLUMNS: &str = "id, post_id, platform, connected_account_id, status, \
                                external_post_id, external_url, error_message, published_at, \
                                created_at, updated_at";

impl Database {
    pub(super) async fn migrate_posts(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content TEXT NOT NULL,
                media_urls TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'draft'
                    CHECK (status IN ('draft', 'published', 'partially_published', 'failed')),
                published_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_posts_user_created ON posts(user_id, created_at DESC, id DESC)",
            r"
            CREATE TABLE IF NOT EXISTS post_platform (
                id TEXT PRIMARY KEY,
                post_id TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                platform TEXT NOT NULL,
                connected_account_id TEXT REFERENCES connected_accounts(id) ON DELETE SET NULL,
                status TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'published', 'failed')),
                external_post_id TEXT,
                external_url TEXT,
                error_message TEXT,
                published_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (post_id, platform)
            )
            ",
        ])
        .await
    }

    fn row_to_post(row: &SqliteRow) -> AppResult<Post> {
        Ok(Post {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            content: row.get("content"),
            media_urls: from_json(&row.get::<String, _>("media_urls"))?,
            status: parse_enum(&row.get::<String, _>("status"))?,
            published_at: parse_opt_ts(row.get("published_at"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
            platforms: Vec::new(),
        })
    }

    fn row_to_post_platform(row: &SqliteRow) -> AppResult<PostPlatform> {
        Ok(PostPlatform {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            post_id: parse_uuid(&row.get::<String, _>("post_id"))?,
            platform: parse_enum(&row.get::<String, _>("platform"))?,
            connected_account_id: parse_opt_uuid(row.get("connected_account_id"))?,
            status: parse_enum(&row.get::<String, _>("status"))?,
            external_post_id: row.get("external_post_id"),
            external_url: row.get("external_url"),
            error_message: row.get("error_message"),
            published_at: parse_opt_ts(row.get("published_at"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
        })
    }

    async fn insert_post_platforms(
        conn: &mut SqliteConnection,
        platforms: &[PostPlatform],
    ) -> AppResult<()> {
        for platform in platforms {
            sqlx::query(
                r"
                INSERT INTO post_platform (id, post_id, platform, connected_account_id, status,
                                           external_post_id, external_url, error_message,
                                           published_at, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ",
            )
            .bind(platform.id.to_string())
            .bind(platform.post_id.to_string())
            .bind(platform.platform.as_str())
            .bind(platform.connected_account_id.map(|id| id.to_string()))
            .bind(platform.status.as_str())
            .bind(&platform.external_post_id)
            .bind(&platform.external_url)
            .bind(&platform.error_message)
            .bind(fmt_opt_ts(platform.published_at.as_ref()))
            .bind(fmt_ts(&platform.created_at))
            .bind(fmt_ts(&platform.updated_at))
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Attach platform rows to the given posts
    async fn load_post_platforms(&self, posts: &mut [Post]) -> AppResult<()> {
        if posts.is_empty() {
            return Ok(());
        }
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {PLATFORM_COLUMNS} FROM post_platform WHERE post_id IN ("
        ));
        let mut separated = qb.separated(", ");
        for post in posts.iter() {
            separated.push_bind(post.id.to_string());
        }
        qb.push(") ORDER BY platform ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut by_post: HashMap<Uuid, Vec<PostPlatform>> = HashMap::new();
        for row in &rows {
            let platform = Self::row_to_post_platform(row)?;
            by_post.entry(platform.post_id).or_default().push(platform);
        }
        for post in posts.iter_mut() {
            post.platforms = by_post.remove(&post.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl PostRepository for Database {
    async fn create_post(&self, post: &Post) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            INSERT INTO posts (id, user_id, content, media_urls, status, published_at,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(post.id.to_string())
        .bind(post.user_id.to_string())
        .bind(&post.content)
        .bind(to_json(&post.media_urls)?)
        .bind(post.status.as_str())
        .bind(fmt_opt_ts(post.published_at.as_ref()))
        .bind(fmt_ts(&post.created_at))
        .bind(fmt_ts(&post.updated_at))
        .execute(&mut *tx)
        .await?;

        Self::insert_post_platforms(&mut *tx, &post.platforms).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_post(&self, user_id: Uuid, post_id: Uuid) -> AppResult<Option<Post>> {
        let row = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(post_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut posts = vec![Self::row_to_post(&row)?];
        self.load_post_platforms(&mut posts).await?;
        Ok(posts.pop())
    }

    async fn list_posts(
        &self,
        user_id: Uuid,
        status: Option<PostStatus>,
        include_deleted: bool,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<Post>> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE user_id = "));
        qb.push_bind(user_id.to_string());
        if !include_deleted {
            qb.push(" AND deleted_at IS NULL");
        }
        if let Some(status) = status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        push_cursor_filter(&mut qb, params)?;
        push_page_order(&mut qb, params);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let posts = rows
            .iter()
            .map(Self::row_to_post)
            .collect::<AppResult<Vec<_>>>()?;
        let page = CursorPage::from_lookahead(posts, params.limit, |p: &Post| {
            Cursor::new(p.created_at, &p.id.to_string())
        });

        let CursorPage {
            mut items,
            next_cursor,
            has_more,
            ..
        } = page;
        self.load_post_platforms(&mut items).await?;
        Ok(CursorPage::new(items, next_cursor, has_more))
    }

    async fn update_post(&self, post: &Post, replace_platforms: bool) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"
            UPDATE posts SET
                content = $3,
                media_urls = $4,
                status = $5,
                published_at = $6,
                updated_at = $7
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(post.id.to_string())
        .bind(post.user_id.to_string())
        .bind(&post.content)
        .bind(to_json(&post.media_urls)?)
        .bind(post.status.as_str())
        .bind(fmt_opt_ts(post.published_at.as_ref()))
        .bind(fmt_ts(&post.updated_at))
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Post"));
        }

        if replace_platforms {
            sqlx::query("DELETE FROM post_platform WHERE post_id = $1")
                .bind(post.id.to_string())
                .execute(&mut *tx)
                .await?;
            Self::insert_post_platforms(&mut *tx, &post.platforms).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_post_platform(&self, platform: &PostPlatform) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE post_platform SET
                connected_account_id = $2,
                status = $3,
                external_post_id = $4,
                external_url = $5,
                error_message = $6,
                published_at = $7,
                updated_at = $8
            WHERE id = $1
            ",
        )
        .bind(platform.id.to_string())
        .bind(platform.connected_account_id.map(|id| id.to_string()))
        .bind(platform.status.as_str())
        .bind(&platform.external_post_id)
        .bind(&platform.external_url)
        .bind(&platform.error_message)
        .bind(fmt_opt_ts(platform.published_at.as_ref()))
        .bind(fmt_ts(&platform.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn soft_delete_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE posts SET deleted_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(post_id.to_string())
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
