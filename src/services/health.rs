// ABOUTME: Health profile upsert, lookup with derived metrics, and deletion
// ABOUTME: Validates body measurements against supported ranges and normalizes list fields
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use nora_core::constants::health_bounds::{
    MAX_AGE, MAX_HEIGHT_CM, MAX_WEIGHT_KG, MIN_AGE, MIN_HEIGHT_CM, MIN_WEIGHT_KG,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::validation::{check_range_f64, check_range_i64, normalize_list};
use crate::database::{Database, HealthProfileRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{ActivityLevel, HealthMetrics, HealthProfile, Sex};

/// Profile body; the stored profile is replaced by these values
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthProfileInput {
    /// Age in years
    pub age: Option<i64>,
    /// Sex used for BMR
    pub sex: Option<Sex>,
    /// Height in centimeters
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    pub weight_kg: Option<f64>,
    /// Activity level used for TDEE
    pub activity_level: Option<ActivityLevel>,
    /// Free-form goals
    #[serde(default)]
    pub fitness_goals: Vec<String>,
    /// Diet styles
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    /// Allergens checked against meal plans
    #[serde(default)]
    pub allergens: Vec<String>,
    /// Conditions to take into account
    #[serde(default)]
    pub medical_conditions: Vec<String>,
}

/// Profile with its derived metrics
#[derive(Debug, Clone, Serialize)]
pub struct HealthProfileView {
    /// Stored profile
    pub profile: HealthProfile,
    /// BMI, BMR and TDEE
    pub metrics: HealthMetrics,
}

impl From<HealthProfile> for HealthProfileView {
    fn from(profile: HealthProfile) -> Self {
        let metrics = HealthMetrics::for_profile(&profile);
        Self { profile, metrics }
    }
}

fn validate(input: &HealthProfileInput) -> AppResult<()> {
    check_range_i64("Age", input.age, MIN_AGE, MAX_AGE)?;
    check_range_f64("Height", input.height_cm, MIN_HEIGHT_CM, MAX_HEIGHT_CM)?;
    check_range_f64("Weight", input.weight_kg, MIN_WEIGHT_KG, MAX_WEIGHT_KG)?;
    Ok(())
}

/// Create the user's profile, or replace the active one
///
/// # Errors
///
/// Returns a value-out-of-range error for implausible measurements and
/// database errors
pub async fn upsert_profile(
    database: &Database,
    user_id: Uuid,
    input: HealthProfileInput,
    now: DateTime<Utc>,
) -> AppResult<HealthProfileView> {
    validate(&input)?;
    let existing = database.get_health_profile(user_id).await?;

    let profile = HealthProfile {
        id: existing.as_ref().map_or_else(Uuid::new_v4, |p| p.id),
        user_id,
        age: input.age,
        sex: input.sex,
        height_cm: input.height_cm,
        weight_kg: input.weight_kg,
        activity_level: input.activity_level,
        fitness_goals: normalize_list(input.fitness_goals),
        dietary_preferences: normalize_list(input.dietary_preferences),
        allergens: normalize_list(input.allergens),
        medical_conditions: normalize_list(input.medical_conditions),
        created_at: existing.as_ref().map_or(now, |p| p.created_at),
        updated_at: now,
        deleted_at: None,
    };

    if existing.is_some() {
        database.update_health_profile(&profile).await?;
    } else {
        database.create_health_profile(&profile).await?;
        info!(user.id = %user_id, "Health profile created");
    }
    Ok(profile.into())
}

/// The user's active profile with metrics
///
/// # Errors
///
/// Returns not found if the user has no active profile
pub async fn get_profile(database: &Database, user_id: Uuid) -> AppResult<HealthProfileView> {
    database
        .get_health_profile(user_id)
        .await?
        .map(HealthProfileView::from)
        .ok_or_else(|| AppError::not_found("Health profile"))
}

/// Soft-delete the active profile
///
/// # Errors
///
/// Returns not found if the user has no active profile
pub async fn delete_profile(database: &Database, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
    if !database.soft_delete_health_profile(user_id, now).await? {
        return Err(AppError::not_found("Health profile"));
    }
    info!(user.id = %user_id, "Health profile deleted");
    Ok(())
}

/// Allergens of the user's active profile, empty without a profile
///
/// # Errors
///
/// Returns a database error if the lookup fails
pub async fn profile_allergens(database: &Database, user_id: Uuid) -> AppResult<Vec<String>> {
    Ok(database
        .get_health_profile(user_id)
        .await?
        .map(|p| p.allergens)
        .unwrap_or_default())
}
