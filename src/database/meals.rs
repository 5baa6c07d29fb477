// ABOUTME: Meal and daily meal plan database operations
// ABOUTME: One active plan per user per date, enforced by a partial unique index
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use super::{
    fmt_date, fmt_ts, from_json, parse_date, parse_enum, parse_opt_ts, parse_ts, parse_uuid,
    push_cursor_filter, push_page_order, to_json, Database, MealRepository,
};
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::models::{DailyMealPlan, Meal, MealType};
use crate::pagination::{Cursor, CursorPage, PaginationParams};

const MEAL_COLUMNS: &str = "id, user_id, name, description, meal_type, calories, protein_g, \
                            carbs_g, fat_g, ingredients, allergens, created_at, updated_at, \
                            deleted_at";

const PLAN_COLUMNS: &str = "id, user_id, plan_date, meal_ids, target_calories, notes, \
                            created_at, updated_at, deleted_at";

impl Database {
    pub(super) async fn migrate_meals(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS meals (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                description TEXT,
                meal_type TEXT NOT NULL
                    CHECK (meal_type IN ('breakfast', 'lunch', 'dinner', 'snack')),
                calories REAL,
                protein_g REAL,
                carbs_g REAL,
                fat_g REAL,
                ingredients TEXT NOT NULL DEFAULT '[]',
                allergens TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            "CREATE INDEX IF NOT EXISTS idx_meals_user_created ON meals(user_id, created_at DESC, id DESC)",
            r"
            CREATE TABLE IF NOT EXISTS daily_meal_plans (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                plan_date TEXT NOT NULL,
                meal_ids TEXT NOT NULL DEFAULT '[]',
                target_calories REAL,
                notes TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_daily_meal_plans_active_date
            ON daily_meal_plans(user_id, plan_date) WHERE deleted_at IS NULL
            ",
        ])
        .await
    }

    fn row_to_meal(row: &SqliteRow) -> AppResult<Meal> {
        Ok(Meal {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            name: row.get("name"),
            description: row.get("description"),
            meal_type: parse_enum(&row.get::<String, _>("meal_type"))?,
            calories: row.get("calories"),
            protein_g: row.get("protein_g"),
            carbs_g: row.get("carbs_g"),
            fat_g: row.get("fat_g"),
            ingredients: from_json(&row.get::<String, _>("ingredients"))?,
            allergens: from_json(&row.get::<String, _>("allergens"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }

    fn row_to_meal_plan(row: &SqliteRow) -> AppResult<DailyMealPlan> {
        Ok(DailyMealPlan {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            plan_date: parse_date(&row.get::<String, _>("plan_date"))?,
            meal_ids: from_json(&row.get::<String, _>("meal_ids"))?,
            target_calories: row.get("target_calories"),
            notes: row.get("notes"),
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }
}

#[async_trait]
impl MealRepository for Database {
    async fn create_meal(&self, meal: &Meal) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO meals (id, user_id, name, description, meal_type, calories, protein_g,
                               carbs_g, fat_g, ingredients, allergens, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(meal.id.to_string())
        .bind(meal.user_id.to_string())
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(meal.meal_type.as_str())
        .bind(meal.calories)
        .bind(meal.protein_g)
        .bind(meal.carbs_g)
        .bind(meal.fat_g)
        .bind(to_json(&meal.ingredients)?)
        .bind(to_json(&meal.allergens)?)
        .bind(fmt_ts(&meal.created_at))
        .bind(fmt_ts(&meal.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_meal(&self, user_id: Uuid, meal_id: Uuid) -> AppResult<Option<Meal>> {
        let row = sqlx::query(&format!(
            "SELECT {MEAL_COLUMNS} FROM meals WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(meal_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_meal).transpose()
    }

    async fn get_meals_by_ids(&self, user_id: Uuid, meal_ids: &[Uuid]) -> AppResult<Vec<Meal>> {
        if meal_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = "));
        qb.push_bind(user_id.to_string())
            .push(" AND deleted_at IS NULL AND id IN (");
        let mut separated = qb.separated(", ");
        for id in meal_ids {
            separated.push_bind(id.to_string());
        }
        qb.push(")");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(Self::row_to_meal).collect()
    }

    async fn list_meals(
        &self,
        user_id: Uuid,
        meal_type: Option<MealType>,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<Meal>> {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("SELECT {MEAL_COLUMNS} FROM meals WHERE user_id = "));
        qb.push_bind(user_id.to_string())
            .push(" AND deleted_at IS NULL");
        if let Some(meal_type) = meal_type {
            qb.push(" AND meal_type = ").push_bind(meal_type.as_str());
        }
        push_cursor_filter(&mut qb, params)?;
        push_page_order(&mut qb, params);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let meals = rows
            .iter()
            .map(Self::row_to_meal)
            .collect::<AppResult<Vec<_>>>()?;
        Ok(CursorPage::from_lookahead(meals, params.limit, |m: &Meal| {
            Cursor::new(m.created_at, &m.id.to_string())
        }))
    }

    async fn update_meal(&self, meal: &Meal) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE meals SET
                name = $3,
                description = $4,
                meal_type = $5,
                calories = $6,
                protein_g = $7,
                carbs_g = $8,
                fat_g = $9,
                ingredients = $10,
                allergens = $11,
                updated_at = $12
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(meal.id.to_string())
        .bind(meal.user_id.to_string())
        .bind(&meal.name)
        .bind(&meal.description)
        .bind(meal.meal_type.as_str())
        .bind(meal.calories)
        .bind(meal.protein_g)
        .bind(meal.carbs_g)
        .bind(meal.fat_g)
        .bind(to_json(&meal.ingredients)?)
        .bind(to_json(&meal.allergens)?)
        .bind(fmt_ts(&meal.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Meal"));
        }
        Ok(())
    }

    async fn soft_delete_meal(
        &self,
        user_id: Uuid,
        meal_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE meals SET deleted_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(meal_id.to_string())
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_meal_plan(&self, plan: &DailyMealPlan) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO daily_meal_plans (id, user_id, plan_date, meal_ids, target_calories,
                                          notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(plan.id.to_string())
        .bind(plan.user_id.to_string())
        .bind(fmt_date(plan.plan_date))
        .bind(to_json(&plan.meal_ids)?)
        .bind(plan.target_calories)
        .bind(&plan.notes)
        .bind(fmt_ts(&plan.created_at))
        .bind(fmt_ts(&plan.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            err if err.code == ErrorCode::ResourceAlreadyExists => AppError::already_exists(
                format!("A meal plan already exists for {}", plan.plan_date),
            ),
            err => err,
        })?;
        Ok(())
    }

    async fn get_meal_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Option<DailyMealPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM daily_meal_plans \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
        ))
        .bind(plan_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_meal_plan).transpose()
    }

    async fn get_meal_plan_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<DailyMealPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {PLAN_COLUMNS} FROM daily_meal_plans \
             WHERE user_id = $1 AND plan_date = $2 AND deleted_at IS NULL"
        ))
        .bind(user_id.to_string())
        .bind(fmt_date(date))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_meal_plan).transpose()
    }

    async fn list_meal_plans(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<DailyMealPlan>> {
        let mut qb: QueryBuilder<'_, Sqlite> = QueryBuilder::new(format!(
            "SELECT {PLAN_COLUMNS} FROM daily_meal_plans WHERE user_id = "
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
        rows.iter().map(Self::row_to_meal_plan).collect()
    }

    async fn soft_delete_meal_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE daily_meal_plans SET deleted_at = $3, updated_at = $3
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(plan_id.to_string())
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
