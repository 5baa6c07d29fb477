// ABOUTME: Health profile model and derived body metrics
// ABOUTME: BMI, Mifflin-St Jeor BMR, and activity-scaled TDEE
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sex used for metabolic estimates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    /// Female
    Female,
    /// Male
    Male,
    /// Other or undisclosed
    Other,
}

string_enum!(Sex, "sex", {
    Female => "female",
    Male => "male",
    Other => "other",
});

/// Habitual activity level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little or no exercise
    Sedentary,
    /// Exercise 1-3 days a week
    Light,
    /// Exercise 3-5 days a week
    Moderate,
    /// Exercise 6-7 days a week
    Active,
    /// Hard exercise or a physical job
    VeryActive,
}

string_enum!(ActivityLevel, "activity level", {
    Sedentary => "sedentary",
    Light => "light",
    Moderate => "moderate",
    Active => "active",
    VeryActive => "very_active",
});

impl ActivityLevel {
    /// TDEE multiplier applied to BMR
    #[must_use]
    pub const fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::Light => 1.375,
            Self::Moderate => 1.55,
            Self::Active => 1.725,
            Self::VeryActive => 1.9,
        }
    }
}

/// Health and dietary profile of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthProfile {
    /// Row id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Age in years
    pub age: Option<i64>,
    /// Sex
    pub sex: Option<Sex>,
    /// Height in centimetres
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    pub weight_kg: Option<f64>,
    /// Activity level
    pub activity_level: Option<ActivityLevel>,
    /// Free-form goals
    pub fitness_goals: Vec<String>,
    /// Diets followed (vegetarian, keto, ...)
    pub dietary_preferences: Vec<String>,
    /// Food allergens to avoid
    pub allergens: Vec<String>,
    /// Conditions relevant to coaching
    pub medical_conditions: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Metrics derived from a profile; each is present only when its inputs are
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct HealthMetrics {
    /// Body mass index, one decimal
    pub bmi: Option<f64>,
    /// Basal metabolic rate in kcal/day
    pub bmr: Option<f64>,
    /// Total daily energy expenditure in kcal/day
    pub tdee: Option<f64>,
}

impl HealthMetrics {
    /// Compute metrics for a profile
    #[must_use]
    pub fn for_profile(profile: &HealthProfile) -> Self {
        let bmi = match (profile.height_cm, profile.weight_kg) {
            (Some(h), Some(w)) if h > 0.0 => {
                let meters = h / 100.0;
                Some(round_to(w / (meters * meters), 1))
            }
            _ => None,
        };

        let bmr = match (profile.height_cm, profile.weight_kg, profile.age, profile.sex) {
            (Some(h), Some(w), Some(age), Some(sex)) => {
                let base = 10.0f64.mul_add(w, 6.25 * h) - 5.0 * age as f64;
                let offset = match sex {
                    Sex::Male => 5.0,
                    Sex::Female => -161.0,
                    // Midpoint of the two sex-specific constants
                    Sex::Other => -78.0,
                };
                Some((base + offset).round())
            }
            _ => None,
        };

        let tdee = match (bmr, profile.activity_level) {
            (Some(bmr), Some(level)) => Some((bmr * level.multiplier()).round()),
            _ => None,
        };

        Self { bmi, bmr, tdee }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> HealthProfile {
        let now = Utc::now();
        HealthProfile {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            age: Some(30),
            sex: Some(Sex::Male),
            height_cm: Some(180.0),
            weight_kg: Some(80.0),
            activity_level: Some(ActivityLevel::Moderate),
            fitness_goals: vec![],
            dietary_preferences: vec![],
            allergens: vec![],
            medical_conditions: vec![],
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_full_metrics() {
        let metrics = HealthMetrics::for_profile(&profile());
        assert_eq!(metrics.bmi, Some(24.7));
        // 10*80 + 6.25*180 - 5*30 + 5 = 1780
        assert_eq!(metrics.bmr, Some(1780.0));
        assert_eq!(metrics.tdee, Some((1780.0f64 * 1.55).round()));
    }

    #[test]
    fn test_female_offset() {
        let mut p = profile();
        p.sex = Some(Sex::Female);
        assert_eq!(HealthMetrics::for_profile(&p).bmr, Some(1614.0));
    }

    #[test]
    fn test_missing_inputs_drop_dependent_metrics() {
        let mut p = profile();
        p.age = None;
        let metrics = HealthMetrics::for_profile(&p);
        assert!(metrics.bmi.is_some());
        assert!(metrics.bmr.is_none());
        assert!(metrics.tdee.is_none());

        let mut p = profile();
        p.activity_level = None;
        let metrics = HealthMetrics::for_profile(&p);
        assert!(metrics.bmr.is_some());
        assert!(metrics.tdee.is_none());
    }
}
