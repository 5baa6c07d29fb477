// ABOUTME: SQLite connection management, schema migrations, and row decoding helpers
// ABOUTME: Repository implementations live in the per-feature submodules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Database Management
//!
//! A single [`Database`] wraps the `SQLite` pool. Each feature module adds its
//! own `migrate_*` step and implements its repository trait from
//! [`repositories`] on `Database`.
//!
//! Timestamps are stored as RFC 3339 strings with millisecond precision and a
//! `Z` suffix, so lexical order equals chronological order and keyset
//! pagination can compare the text columns directly.

pub mod repositories;

mod accounts;
mod auth_tokens;
mod conversations;
mod health_profiles;
mod meals;
mod posts;
mod signers;
mod users;
mod waitlist;
mod workouts;

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::pagination::PaginationParams;

pub use repositories::{
    AccountRepository, AuthTokenRepository, ConversationRepository, HealthProfileRepository,
    MealRepository, PostRepository, SignerRepository, UserRepository, WaitlistRepository,
    WorkoutRepository,
};

/// Database manager for every persisted entity
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run migrations
    ///
    /// # Errors
    ///
    /// Returns a database error if the URL is invalid, the file cannot be
    /// created, or a migration fails
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let in_memory = database_url.contains(":memory:");
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid DATABASE_URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        // Every connection to `:memory:` is a separate database, so keep exactly one
        let pool = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(10)
                .acquire_timeout(Duration::from_secs(30))
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await
        }
        .map_err(|e| AppError::database(format!("Failed to connect to database: {e}")))?;

        let db = Self { pool };
        db.migrate().await?;
        info!(in_memory, "Database ready");
        Ok(db)
    }

    /// Get a reference to the connection pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run all migrations; every statement is idempotent
    ///
    /// # Errors
    ///
    /// Returns a database error if a statement fails
    pub async fn migrate(&self) -> AppResult<()> {
        // Order follows foreign key dependencies
        self.migrate_users().await?;
        self.migrate_auth_tokens().await?;
        self.migrate_accounts().await?;
        self.migrate_posts().await?;
        self.migrate_signers().await?;
        self.migrate_health_profiles().await?;
        self.migrate_meals().await?;
        self.migrate_workouts().await?;
        self.migrate_conversations().await?;
        self.migrate_waitlist().await?;
        Ok(())
    }

    /// Liveness probe used by the readiness endpoint
    ///
    /// # Errors
    ///
    /// Returns a database error if the pool cannot run a query
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn execute_all(&self, statements: &[&str]) -> AppResult<()> {
        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Migration failed: {e}")))?;
        }
        Ok(())
    }
}

/// Current time truncated to the stored precision
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

pub(crate) fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn fmt_opt_ts(ts: Option<&DateTime<Utc>>) -> Option<String> {
    ts.map(fmt_ts)
}

pub(crate) fn parse_ts(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::database(format!("Invalid timestamp '{value}': {e}")))
}

pub(crate) fn parse_opt_ts(value: Option<String>) -> AppResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| AppError::database(format!("Invalid date '{value}': {e}")))
}

pub(crate) fn parse_uuid(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::database(format!("Invalid UUID '{value}': {e}")))
}

pub(crate) fn parse_opt_uuid(value: Option<String>) -> AppResult<Option<Uuid>> {
    value.as_deref().map(parse_uuid).transpose()
}

pub(crate) fn parse_enum<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = AppError>,
{
    value
        .parse()
        .map_err(|e: AppError| AppError::database(e.message))
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> AppResult<String> {
    serde_json::to_string(value)
        .map_err(|e| AppError::database(format!("Failed to encode JSON column: {e}")))
}

pub(crate) fn from_json<T: DeserializeOwned>(value: &str) -> AppResult<T> {
    serde_json::from_str(value)
        .map_err(|e| AppError::database(format!("Invalid JSON column: {e}")))
}

/// Append the keyset condition for `params.cursor` (newest first)
pub(crate) fn push_cursor_filter(
    qb: &mut QueryBuilder<'_, Sqlite>,
    params: &PaginationParams,
) -> AppResult<()> {
    if let Some(cursor) = &params.cursor {
        let position = cursor
            .position()
            .ok_or_else(|| AppError::invalid_input("Invalid pagination cursor"))?;
        let ts = fmt_ts(&position.created_at);
        qb.push(" AND (created_at < ")
            .push_bind(ts.clone())
            .push(" OR (created_at = ")
            .push_bind(ts)
            .push(" AND id < ")
            .push_bind(position.id)
            .push("))");
    }
    Ok(())
}

/// Append ordering and the `limit + 1` lookahead row
pub(crate) fn push_page_order(qb: &mut QueryBuilder<'_, Sqlite>, params: &PaginationParams) {
    qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(i64::try_from(params.limit + 1).unwrap_or(i64::MAX));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_format_sorts_lexically() {
        let earlier = parse_ts("2025-01-02T03:04:05.006Z").unwrap();
        let later = parse_ts("2025-01-02T03:04:05.100Z").unwrap();
        assert!(fmt_ts(&earlier) < fmt_ts(&later));
        assert_eq!(fmt_ts(&earlier), "2025-01-02T03:04:05.006Z");
    }

    #[test]
    fn test_now_has_millisecond_precision() {
        let ts = now();
        assert_eq!(parse_ts(&fmt_ts(&ts)).unwrap(), ts);
    }

    #[test]
    fn test_bad_values_are_database_errors() {
        assert!(parse_uuid("nope").is_err());
        assert!(parse_date("2025-13-01").is_err());
        assert!(from_json::<Vec<String>>("{").is_err());
    }
}
