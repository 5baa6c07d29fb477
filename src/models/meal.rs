// ABOUTME: Meal and daily meal plan models
// ABOUTME: Plans reference meals by id; nutrition totals are computed on read
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Slot a meal fills in the day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    /// Breakfast
    Breakfast,
    /// Lunch
    Lunch,
    /// Dinner
    Dinner,
    /// Snack
    Snack,
}

string_enum!(MealType, "meal type", {
    Breakfast => "breakfast",
    Lunch => "lunch",
    Dinner => "dinner",
    Snack => "snack",
});

/// Meal recorded by a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    /// Unique meal id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Slot
    pub meal_type: MealType,
    /// Energy in kcal
    pub calories: Option<f64>,
    /// Protein in grams
    pub protein_g: Option<f64>,
    /// Carbohydrates in grams
    pub carbs_g: Option<f64>,
    /// Fat in grams
    pub fat_g: Option<f64>,
    /// Ingredients
    pub ingredients: Vec<String>,
    /// Allergens contained
    pub allergens: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Meals planned for one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMealPlan {
    /// Unique plan id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Day the plan is for
    pub plan_date: NaiveDate,
    /// Meals in order
    pub meal_ids: Vec<Uuid>,
    /// Calorie target for the day
    pub target_calories: Option<f64>,
    /// Notes
    pub notes: Option<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}
