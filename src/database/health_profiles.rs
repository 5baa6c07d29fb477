// ABOUTME: Health profile database operations
// ABOUTME: One active profile per user; deleted profiles stay as history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{
    fmt_ts, from_json, parse_enum, parse_opt_ts, parse_ts, parse_uuid, to_json, Database,
    HealthProfileRepository,
};
use crate::errors::{AppError, AppResult};
use crate::models::HealthProfile;

const PROFILE_COLUMNS: &str = "id, user_id, age, sex, height_cm, weight_kg, activity_level, \
                               fitness_goals, dietary_preferences, allergens, medical_conditions, \
                               created_at, updated_at, deleted_at";

impl Database {
    pub(super) async fn migrate_health_profiles(&self) -> AppResult<()> {
        self.execute_all(&[
            r"
            CREATE TABLE IF NOT EXISTS health_profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                age INTEGER,
                sex TEXT,
                height_cm REAL,
                weight_kg REAL,
                activity_level TEXT,
                fitness_goals TEXT NOT NULL DEFAULT '[]',
                dietary_preferences TEXT NOT NULL DEFAULT '[]',
                allergens TEXT NOT NULL DEFAULT '[]',
                medical_conditions TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT
            )
            ",
            r"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_health_profiles_active_user
            ON health_profiles(user_id) WHERE deleted_at IS NULL
            ",
        ])
        .await
    }

    fn row_to_health_profile(row: &SqliteRow) -> AppResult<HealthProfile> {
        let sex: Option<String> = row.get("sex");
        let activity_level: Option<String> = row.get("activity_level");
        Ok(HealthProfile {
            id: parse_uuid(&row.get::<String, _>("id"))?,
            user_id: parse_uuid(&row.get::<String, _>("user_id"))?,
            age: row.get("age"),
            sex: sex.as_deref().map(parse_enum).transpose()?,
            height_cm: row.get("height_cm"),
            weight_kg: row.get("weight_kg"),
            activity_level: activity_level.as_deref().map(parse_enum).transpose()?,
            fitness_goals: from_json(&row.get::<String, _>("fitness_goals"))?,
            dietary_preferences: from_json(&row.get::<String, _>("dietary_preferences"))?,
            allergens: from_json(&row.get::<String, _>("allergens"))?,
            medical_conditions: from_json(&row.get::<String, _>("medical_conditions"))?,
            created_at: parse_ts(&row.get::<String, _>("created_at"))?,
            updated_at: parse_ts(&row.get::<String, _>("updated_at"))?,
            deleted_at: parse_opt_ts(row.get("deleted_at"))?,
        })
    }
}

#[async_trait]
impl HealthProfileRepository for Database {
    async fn get_health_profile(&self, user_id: Uuid) -> AppResult<Option<HealthProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM health_profiles \
             WHERE user_id = $1 AND deleted_at IS NULL"
        ))
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_health_profile).transpose()
    }

    async fn create_health_profile(&self, profile: &HealthProfile) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO health_profiles (id, user_id, age, sex, height_cm, weight_kg,
                                         activity_level, fitness_goals, dietary_preferences,
                                         allergens, medical_conditions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ",
        )
        .bind(profile.id.to_string())
        .bind(profile.user_id.to_string())
        .bind(profile.age)
        .bind(profile.sex.map(|s| s.as_str()))
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.activity_level.map(|a| a.as_str()))
        .bind(to_json(&profile.fitness_goals)?)
        .bind(to_json(&profile.dietary_preferences)?)
        .bind(to_json(&profile.allergens)?)
        .bind(to_json(&profile.medical_conditions)?)
        .bind(fmt_ts(&profile.created_at))
        .bind(fmt_ts(&profile.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_health_profile(&self, profile: &HealthProfile) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE health_profiles SET
                age = $3,
                sex = $4,
                height_cm = $5,
                weight_kg = $6,
                activity_level = $7,
                fitness_goals = $8,
                dietary_preferences = $9,
                allergens = $10,
                medical_conditions = $11,
                updated_at = $12
            WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
            ",
        )
        .bind(profile.id.to_string())
        .bind(profile.user_id.to_string())
        .bind(profile.age)
        .bind(profile.sex.map(|s| s.as_str()))
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.activity_level.map(|a| a.as_str()))
        .bind(to_json(&profile.fitness_goals)?)
        .bind(to_json(&profile.dietary_preferences)?)
        .bind(to_json(&profile.allergens)?)
        .bind(to_json(&profile.medical_conditions)?)
        .bind(fmt_ts(&profile.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Health profile"));
        }
        Ok(())
    }

    async fn soft_delete_health_profile(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE health_profiles SET deleted_at = $2, updated_at = $2
            WHERE user_id = $1 AND deleted_at IS NULL
            ",
        )
        .bind(user_id.to_string())
        .bind(fmt_ts(&now))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
