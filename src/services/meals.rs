// ABOUTME: Meal library management and daily meal plans with nutrition totals
// ABOUTME: Plan views resolve meals, sum macros and flag allergens from the health profile
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use nora_core::constants::health_bounds::MAX_MEAL_CALORIES;
use nora_core::constants::limits::{MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::health::profile_allergens;
use super::validation::{
    check_max_len, check_non_negative, check_range_f64, normalize_list, normalize_optional,
    parse_date, require_text,
};
use crate::database::{Database, MealRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{DailyMealPlan, Meal, MealType};
use crate::pagination::{CursorPage, PaginationParams};

/// Meal body used for create and replace
#[derive(Debug, Clone, Deserialize)]
pub struct MealInput {
    /// Meal name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Slot in the day
    pub meal_type: MealType,
    /// Energy in kcal
    pub calories: Option<f64>,
    /// Protein grams
    pub protein_g: Option<f64>,
    /// Carbohydrate grams
    pub carbs_g: Option<f64>,
    /// Fat grams
    pub fat_g: Option<f64>,
    /// Ingredient list
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Allergens present
    #[serde(default)]
    pub allergens: Vec<String>,
}

/// Meal plan body
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMealPlanRequest {
    /// Day the plan is for (`YYYY-MM-DD`)
    pub plan_date: String,
    /// Meals in eating order
    pub meal_ids: Vec<Uuid>,
    /// Calorie goal for the day
    pub target_calories: Option<f64>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Summed nutrition of the meals in a plan
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct NutritionTotals {
    /// Energy in kcal
    pub calories: f64,
    /// Protein grams
    pub protein_g: f64,
    /// Carbohydrate grams
    pub carbs_g: f64,
    /// Fat grams
    pub fat_g: f64,
}

impl NutritionTotals {
    fn add(&mut self, meal: &Meal) {
        self.calories += meal.calories.unwrap_or_default();
        self.protein_g += meal.protein_g.unwrap_or_default();
        self.carbs_g += meal.carbs_g.unwrap_or_default();
        self.fat_g += meal.fat_g.unwrap_or_default();
    }
}

/// A meal containing allergens listed in the user's health profile
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AllergenWarning {
    /// Offending meal
    pub meal_id: Uuid,
    /// Its name
    pub meal_name: String,
    /// Matched allergens, as written on the meal
    pub allergens: Vec<String>,
}

/// Plan with resolved meals
#[derive(Debug, Clone, Serialize)]
pub struct MealPlanView {
    /// Stored plan
    pub plan: DailyMealPlan,
    /// Active meals of the plan in plan order
    pub meals: Vec<Meal>,
    /// Summed nutrition of `meals`
    pub totals: NutritionTotals,
    /// Meals conflicting with the profile allergens
    pub allergen_warnings: Vec<AllergenWarning>,
}

fn allergen_warnings(meals: &[Meal], profile_allergens: &[String]) -> Vec<AllergenWarning> {
    if profile_allergens.is_empty() {
        return Vec::new();
    }
    let avoid: HashSet<String> = profile_allergens.iter().map(|a| a.to_lowercase()).collect();
    let mut warned = HashSet::new();
    meals
        .iter()
        .filter(|meal| warned.insert(meal.id))
        .filter_map(|meal| {
            let matched: Vec<String> = meal
                .allergens
                .iter()
                .filter(|a| avoid.contains(&a.to_lowercase()))
                .cloned()
                .collect();
            (!matched.is_empty()).then(|| AllergenWarning {
                meal_id: meal.id,
                meal_name: meal.name.clone(),
                allergens: matched,
            })
        })
        .collect()
}

fn build_meal(user_id: Uuid, id: Uuid, input: MealInput, now: DateTime<Utc>) -> AppResult<Meal> {
    let name = require_text("Name", &input.name, MAX_NAME_LENGTH)?;
    let description = normalize_optional(input.description);
    check_max_len("Description", description.as_deref(), MAX_MESSAGE_LENGTH)?;
    check_range_f64("Calories", input.calories, 0.0, MAX_MEAL_CALORIES)?;
    check_non_negative("Protein", input.protein_g)?;
    check_non_negative("Carbs", input.carbs_g)?;
    check_non_negative("Fat", input.fat_g)?;

    Ok(Meal {
        id,
        user_id,
        name,
        description,
        meal_type: input.meal_type,
        calories: input.calories,
        protein_g: input.protein_g,
        carbs_g: input.carbs_g,
        fat_g: input.fat_g,
        ingredients: normalize_list(input.ingredients),
        allergens: normalize_list(input.allergens),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

/// Add a meal to the user's library
///
/// # Errors
///
/// Returns invalid input or out-of-range errors for bad fields
pub async fn create_meal(
    database: &Database,
    user_id: Uuid,
    input: MealInput,
    now: DateTime<Utc>,
) -> AppResult<Meal> {
    let meal = build_meal(user_id, Uuid::new_v4(), input, now)?;
    database.create_meal(&meal).await?;
    Ok(meal)
}

/// Active meal owned by the user
///
/// # Errors
///
/// Returns not found if the user has no such active meal
pub async fn get_meal(database: &Database, user_id: Uuid, meal_id: Uuid) -> AppResult<Meal> {
    database
        .get_meal(user_id, meal_id)
        .await?
        .ok_or_else(|| AppError::not_found("Meal"))
}

/// Page of meals, newest first
///
/// # Errors
///
/// Returns invalid input for a malformed cursor and database errors
pub async fn list_meals(
    database: &Database,
    user_id: Uuid,
    meal_type: Option<MealType>,
    params: &PaginationParams,
) -> AppResult<CursorPage<Meal>> {
    database.list_meals(user_id, meal_type, params).await
}

/// Replace every editable field of a meal
///
/// # Errors
///
/// Returns not found for an unknown meal and invalid input for bad fields
pub async fn update_meal(
    database: &Database,
    user_id: Uuid,
    meal_id: Uuid,
    input: MealInput,
    now: DateTime<Utc>,
) -> AppResult<Meal> {
    let existing = get_meal(database, user_id, meal_id).await?;
    let mut meal = build_meal(user_id, meal_id, input, now)?;
    meal.created_at = existing.created_at;
    database.update_meal(&meal).await?;
    Ok(meal)
}

/// Soft-delete a meal; plans keep its id but skip it when resolved
///
/// # Errors
///
/// Returns not found if the user has no such active meal
pub async fn delete_meal(
    database: &Database,
    user_id: Uuid,
    meal_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database.soft_delete_meal(user_id, meal_id, now).await? {
        return Err(AppError::not_found("Meal"));
    }
    Ok(())
}

/// Create the plan for a day from meals in the user's library
///
/// # Errors
///
/// Returns invalid input for a bad date or a meal the user does not own, and
/// a conflict when the day already has an active plan
pub async fn create_meal_plan(
    database: &Database,
    user_id: Uuid,
    request: CreateMealPlanRequest,
    now: DateTime<Utc>,
) -> AppResult<MealPlanView> {
    let plan_date = parse_date("plan_date", &request.plan_date)?;
    check_range_f64("Target calories", request.target_calories, 0.0, 20_000.0)?;
    let notes = normalize_optional(request.notes);
    check_max_len("Notes", notes.as_deref(), MAX_MESSAGE_LENGTH)?;

    let requested: HashSet<Uuid> = request.meal_ids.iter().copied().collect();
    let unique_ids: Vec<Uuid> = requested.into_iter().collect();
    let found = database.get_meals_by_ids(user_id, &unique_ids).await?;
    if found.len() != unique_ids.len() {
        let known: HashSet<Uuid> = found.iter().map(|m| m.id).collect();
        let missing: Vec<String> = unique_ids
            .iter()
            .filter(|id| !known.contains(id))
            .map(ToString::to_string)
            .collect();
        return Err(AppError::invalid_input(format!(
            "Unknown meals: {}",
            missing.join(", ")
        )));
    }

    let plan = DailyMealPlan {
        id: Uuid::new_v4(),
        user_id,
        plan_date,
        meal_ids: request.meal_ids,
        target_calories: request.target_calories,
        notes,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    database.create_meal_plan(&plan).await?;
    info!(user.id = %user_id, plan.date = %plan_date, meals = plan.meal_ids.len(), "Meal plan created");

    let allergens = profile_allergens(database, user_id).await?;
    Ok(plan_view(plan, found, &allergens))
}

fn plan_view(plan: DailyMealPlan, meals: Vec<Meal>, profile_allergens: &[String]) -> MealPlanView {
    let by_id: HashMap<Uuid, Meal> = meals.into_iter().map(|m| (m.id, m)).collect();
    let ordered: Vec<Meal> = plan
        .meal_ids
        .iter()
        .filter_map(|id| by_id.get(id).cloned())
        .collect();

    let mut totals = NutritionTotals::default();
    for meal in &ordered {
        totals.add(meal);
    }
    let allergen_warnings = allergen_warnings(&ordered, profile_allergens);

    MealPlanView {
        plan,
        meals: ordered,
        totals,
        allergen_warnings,
    }
}

async fn resolve(database: &Database, plan: DailyMealPlan) -> AppResult<MealPlanView> {
    let meals = database.get_meals_by_ids(plan.user_id, &plan.meal_ids).await?;
    let allergens = profile_allergens(database, plan.user_id).await?;
    Ok(plan_view(plan, meals, &allergens))
}

/// Plan for a day with resolved meals
///
/// # Errors
///
/// Returns not found if the day has no active plan
pub async fn get_meal_plan_by_date(
    database: &Database,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<MealPlanView> {
    let plan = database
        .get_meal_plan_by_date(user_id, date)
        .await?
        .ok_or_else(|| AppError::not_found("Meal plan"))?;
    resolve(database, plan).await
}

/// Plan by id with resolved meals
///
/// # Errors
///
/// Returns not found if the user has no such active plan
pub async fn get_meal_plan(
    database: &Database,
    user_id: Uuid,
    plan_id: Uuid,
) -> AppResult<MealPlanView> {
    let plan = database
        .get_meal_plan(user_id, plan_id)
        .await?
        .ok_or_else(|| AppError::not_found("Meal plan"))?;
    resolve(database, plan).await
}

/// Plans in an inclusive date range, oldest first
///
/// # Errors
///
/// Returns invalid input when `from` is after `to`
pub async fn list_meal_plans(
    database: &Database,
    user_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> AppResult<Vec<DailyMealPlan>> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::invalid_input("'from' must not be after 'to'"));
        }
    }
    database.list_meal_plans(user_id, from, to).await
}

/// Soft-delete a plan, freeing its date
///
/// # Errors
///
/// Returns not found if the user has no such active plan
pub async fn delete_meal_plan(
    database: &Database,
    user_id: Uuid,
    plan_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database.soft_delete_meal_plan(user_id, plan_id, now).await? {
        return Err(AppError::not_found("Meal plan"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(name: &str, calories: f64, allergens: &[&str]) -> Meal {
        let now = Utc::now();
        Meal {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.to_owned(),
            description: None,
            meal_type: MealType::Lunch,
            calories: Some(calories),
            protein_g: Some(10.0),
            carbs_g: None,
            fat_g: Some(5.0),
            ingredients: Vec::new(),
            allergens: allergens.iter().map(|a| (*a).to_owned()).collect(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn plan(meal_ids: Vec<Uuid>) -> DailyMealPlan {
        let now = Utc::now();
        DailyMealPlan {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            plan_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            meal_ids,
            target_calories: None,
            notes: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_plan_view_totals_skip_missing_meals() {
        let oats = meal("Oats", 350.0, &[]);
        let salad = meal("Salad", 420.5, &[]);
        let gone = Uuid::new_v4();
        let view = plan_view(
            plan(vec![oats.id, gone, salad.id]),
            vec![salad.clone(), oats.clone()],
            &[],
        );

        assert_eq!(view.meals.len(), 2);
        assert_eq!(view.meals[0].id, oats.id);
        assert!((view.totals.calories - 770.5).abs() < f64::EPSILON);
        assert!((view.totals.protein_g - 20.0).abs() < f64::EPSILON);
        assert!(view.totals.carbs_g.abs() < f64::EPSILON);
    }

    #[test]
    fn test_allergen_warnings_are_case_insensitive() {
        let satay = meal("Satay", 600.0, &["Peanuts", "Soy"]);
        let rice = meal("Rice", 200.0, &[]);
        let warnings = allergen_warnings(
            &[satay.clone(), rice, satay.clone()],
            &["peanuts".to_owned()],
        );
        assert_eq!(
            warnings,
            vec![AllergenWarning {
                meal_id: satay.id,
                meal_name: "Satay".to_owned(),
                allergens: vec!["Peanuts".to_owned()],
            }]
        );
    }

    #[test]
    fn test_build_meal_validation() {
        let input = MealInput {
            name: "  Omelette ".to_owned(),
            description: Some("   ".to_owned()),
            meal_type: MealType::Breakfast,
            calories: Some(320.0),
            protein_g: Some(21.0),
            carbs_g: Some(2.0),
            fat_g: Some(24.0),
            ingredients: vec!["eggs".to_owned(), "Eggs".to_owned()],
            allergens: vec!["egg".to_owned()],
        };
        let built = build_meal(Uuid::nil(), Uuid::new_v4(), input.clone(), Utc::now()).unwrap();
        assert_eq!(built.name, "Omelette");
        assert!(built.description.is_none());
        assert_eq!(built.ingredients, vec!["eggs".to_owned()]);

        let negative = MealInput { fat_g: Some(-1.0), ..input.clone() };
        assert!(build_meal(Uuid::nil(), Uuid::new_v4(), negative, Utc::now()).is_err());
        let huge = MealInput { calories: Some(10_001.0), ..input };
        assert!(build_meal(Uuid::nil(), Uuid::new_v4(), huge, Utc::now()).is_err());
    }
}
