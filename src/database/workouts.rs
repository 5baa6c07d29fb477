// ABOUTME: Workout, workout session, and daily workout plan database operations
// ABOUTME: Completing a session is conditional on it still being open
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{
    fmt_date, fmt_opt_ts, fmt_ts, from_json, parse_date, parse_enum, parse_opt_ts,
    parse_opt_uuid, parse_ts, parse_uuid, push_cursor_filter, push_page_order, to_json, Database,
    WorkoutRepository,
};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{DailyWorkoutPlan, Workout, WorkoutSession};
use crate::pagination::{Cursor, CursorPage, PaginationParams};

const WORKOUT_COLUMNS: &str = "id, user_id, name, description, workout_type, difficulty, \
                               duration_minutes, exercises, created_at, updated_at, deleted_at";

const SESSION_COLUMNS: &str = "id, user_id, workout_id, started_at, completed_at, \
                               duration_minutes, calories_burned, perceived_effort, exercises, \
                               notes, created_at, updated_at, deleted_at";

const PLAN_COLUMNS: &str = "id, user_id, plan_date, workout_ids, is_rest_day, notes, \
                            created_at, updated_at, deleted_at";

impl Database {
    pub(super) async fn migrate_workouts(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS workouts (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                workout_type TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                duration_minutes INTEGER NOT NULL,
                exercises TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_workouts_user_created ON workouts(user_id, created_at DESC, id DESC)",
            r"
            CREATE TABLE IF NOT EXISTS workout_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                workout_id TEXT REFERENCES workouts(id) ON DELETE SET NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                duration_minutes INTEGER,
                calories_burned REAL,
                perceived_effort INTEGER,
                exercises TEXT NOT NULL DEFAULT '[]',
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_workout_sessions_user_created ON workout_sessions(user_id, created_at DESC, id DESC)",
            r"
            CREATE TABLE IF NOT EXISTS daily_workout_plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                plan_date TEXT NOT NULL,
                workout_ids TEXT NOT NULL DEFAULT '[]',
                is_rest_day INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_daily_workout_plans_active_date
            ON daily_workout_plans(user_id, plan_date) WHERE deleted_at IS NULL
            ",
        ])
        .await
    }

    fn row_to_workout(row: &SqliteRow) -> AppResult<Workout> {
        Ok(Workout {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            name: row.get("name"),
            description: row.get("description"),
            workout_type: parse_enum(&row.get::<String, _>("workout_type"))?,
            difficulty: parse_enum(&row.get::<String, _>("difficulty"))?,
            duration_minutes: row.get("duration_minutes"),
            exercises: from_json(&row.get::<String, _>("exercises"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }

    fn row_to_session(row: &SqliteRow) -> AppResult<WorkoutSession> {
        Ok(WorkoutSession {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            workout_id: parse_opt_uuid(row.get("workout_id"))?,
            started_at: parse_ts(&row.get::<String, _>("started_at"))?,
            completed_at: parse_opt_ts(row.get("completed_at"))?,
            duration_minutes: row.get("duration_minutes"),
            calories_burned: row.get("calories_burned"),
            perceived_effort: row.get("perceived_effort"),
            exercises: from_json(&row.get::<String, _>("exercises"))?,
            notes: row.get("notes"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }

    fn row_to_workout_plan(row: &SqliteRow) -> AppResult<DailyWorkoutPlan> {
        Ok(DailyWorkoutPlan {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            plan_date: parse_date(&row.get::<String, _>("plan_date"))?,
            workout_ids: from_json(&row.get::<String, _>("workout_ids"))?,
            is_rest_day: row.get("is_rest_day"),
            notes: row.get("notes"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }

    async fn soft_delete_owned(
        &self,
        table: &str,
        user_id: Uuid,
        id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(&format!(
            "UPDATE {table} SET deleted_at = $3, updated_at = $3 \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl WorkoutRepository for Database {
    async fn create_workout(&self, workout: &Workout) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO workouts (id, user_id, name, description, workout_type, difficulty,
                                  duration_minutes, exercises, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(workout.id.to_string())
        .bind(workout.user_id.to_string())
        .bind(&workout.name)
        .bind(&workout.description)
        .bind(workout.workout_type.as_str())
        .bind(workout.difficulty.as_str())
        .bind(workout.duration_minutes)
        .bind(to_json(&workout.exercises)?)
        .bind(fmt_ts(&workout.created_at))
        .bind(fmt_ts(&workout.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_workout(&self, user_id: Uuid, workout_id: Uuid) -> AppResult<Option<Workout>> {
        let row = sqlx::query(&format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(workout_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_workout).transpose()
    }

    async fn get_workouts_by_ids(
        &self,
        user_id: Uuid,
        workout_ids: &[Uuid],
    ) -> AppResult<Vec<Workout>> {
        if workout_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE user_id = "));
        qb.push_bind(user_id.to_string())
            .push(" AND deleted_at IS NULL AND id IN (");
        let mut separated = qb.separated(", ");
        for id in workout_ids {
            separated.push_bind(id.to_string());
        }
        qb.push(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_workout).collect()
    }

    async fn list_workouts(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<Workout>> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE user_id = "));
        qb.push_bind(user_id.to_string())
            .push(" AND deleted_at IS NULL");
        push_cursor_filter(&mut qb, params)?;
        push_page_order(&mut qb, params);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let workouts = rows
            .iter()
            .map(Self::row_to_workout)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(CursorPage::from_lookahead(workouts, params.limit, |w: &Workout| {
            Cursor::new(w.created_at, &w.id.to_string())
        }))
    }

    async fn update_workout(&self, workout: &Workout) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE workouts SET
                name = $3,
                description = $4,
                workout_type = $5,
                difficulty = $6,
                duration_minutes = $7,
                exercises = $8,
                updated_at = $9
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(workout.id.to_string())
        .bind(workout.user_id.to_string())
        .bind(&workout.name)
        .bind(&workout.description)
        .bind(workout.workout_type.as_str())
        .bind(workout.difficulty.as_str())
        .bind(workout.duration_minutes)
        .bind(to_json(&workout.exercises)?)
        .bind(fmt_ts(&workout.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Workout"));
        }
        Ok(())
    }

    async fn soft_delete_workout(
        &self,
        user_id: Uuid,
        workout_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.soft_delete_owned("workouts", user_id, workout_id, now)
            .await
    }

    async fn create_session(&self, session: &WorkoutSession) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO workout_sessions (id, user_id, workout_id, started_at, completed_at,
                                          duration_minutes, calories_burned, perceived_effort,
                                          exercises, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(session.workout_id.map(|id| id.to_string()))
        .bind(fmt_ts(&session.started_at))
        .bind(fmt_opt_ts(session.completed_at.as_ref()))
        .bind(session.duration_minutes)
        .bind(session.calories_burned)
        .bind(session.perceived_effort)
        .bind(to_json(&session.exercises)?)
        .bind(&session.notes)
        .bind(fmt_ts(&session.created_at))
        .bind(fmt_ts(&session.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> AppResult<Option<WorkoutSession>> {
        let row = sqlx::query(&format!(
            "SELECT {SESSION_COLUMNS} FROM workout_sessions \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(session_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_session).transpose()
    }

    async fn list_sessions(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<WorkoutSession>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {SESSION_COLUMNS} FROM workout_sessions WHERE user_id = "
        ));
        qb.push_bind(user_id.to_string())
            .push(" AND deleted_at IS NULL");
        push_cursor_filter(&mut qb, params)?;
        push_page_order(&mut qb, params);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let sessions = rows
            .iter()
            .map(Self::row_to_session)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(CursorPage::from_lookahead(
            sessions,
            params.limit,
            |s: &WorkoutSession| Cursor::new(s.created_at, &s.id.to_string()),
        ))
    }

    async fn complete_session(&self, session: &WorkoutSession) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE workout_sessions SET
                completed_at = $3,
                duration_minutes = $4,
                calories_burned = $5,
                perceived_effort = $6,
                notes = $7,
                updated_at = $8
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL AND completed_at IS NULL
            ",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(fmt_opt_ts(session.completed_at.as_ref()))
        .bind(session.duration_minutes)
        .bind(session.calories_burned)
        .bind(session.perceived_effort)
        .bind(&session.notes)
        .bind(fmt_ts(&session.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn soft_delete_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.soft_delete_owned("workout_sessions", user_id, session_id, now)
            .await
    }

    async fn create_workout_plan(&self, plan: &DailyWorkoutPlan) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO daily_workout_plans (id, user_id, plan_date, workout_ids, is_rest_day,
                                             notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(plan.id.to_string())
        .bind(plan.user_id.to_string())
        .bind(fmt_date(plan.plan_date))
        .bind(to_json(&plan.workout_ids)?)
        .bind(plan.is_rest_day)
        .bind(&plan.notes)
        .bind(fmt_ts(&plan.created_at))
        .bind(fmt_ts(&plan.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.code == ErrorCode::ResourceAlreadyExists => AppError::already_exists(
                format!("A workout plan already exists for {}", plan.plan_date),
            ),
            err => err,
        })?;
        Ok(())
    }

    async fn get_workout_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Option<DailyWorkoutPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM daily_workout_plans \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(plan_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_workout_plan).transpose()
    }

    async fn get_workout_plan_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<DailyWorkoutPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM daily_workout_plans \
             WHERE user_id = $1 AND plan_date = $2 AND deleted_at IS NULL"
        ))
        .bind(user_id.to_string())
        .bind(fmt_date(date))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_workout_plan).transpose()
    }

    async fn list_workout_plans(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<DailyWorkoutPlan>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {PLAN_COLUMNS} FROM daily_workout_plans WHERE user_id = "
        ));
        qb.push_bind(user_id.to_string())
            .push(" AND deleted_at IS NULL");
        if let Some(from) = from {
            qb.push(" AND plan_date >= ").push_bind(fmt_date(from));
        }
        if let Some(to) = to {
            qb.push(" AND plan_date <= ").push_bind(fmt_date(to));
        }
        qb.push(" ORDER BY plan_date ASC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_workout_plan).collect()
    }

    async fn soft_delete_workout_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.soft_delete_owned("daily_workout_plans", user_id, plan_id, now)
            .await
    }
}
