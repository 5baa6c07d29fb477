// ABOUTME: Workout templates, performed sessions, and daily workout plans
// ABOUTME: Sessions copy the exercise list of their workout when started
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of workout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutType {
    /// Resistance training
    Strength,
    /// Endurance training
    Cardio,
    /// High-intensity intervals
    Hiit,
    /// Mobility and stretching
    Mobility,
    /// Sport practice
    Sport,
}

string_enum!(WorkoutType, "workout type", {
    Strength => "strength",
    Cardio => "cardio",
    Hiit => "hiit",
    Mobility => "mobility",
    Sport => "sport",
});

/// Difficulty of a workout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Beginner
    Beginner,
    /// Intermediate
    Intermediate,
    /// Advanced
    Advanced,
}

string_enum!(Difficulty, "difficulty", {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

/// One exercise inside a workout or session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    /// Exercise name
    pub name: String,
    /// Number of sets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    /// Repetitions per set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    /// Duration for timed exercises
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u32>,
    /// Load in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    /// Notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Workout template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workout {
    /// Unique workout id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Kind
    pub workout_type: WorkoutType,
    /// Difficulty
    pub difficulty: Difficulty,
    /// Planned duration in minutes
    pub duration_minutes: i64,
    /// Exercises in order
    pub exercises: Vec<Exercise>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Workout actually performed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    /// Unique session id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Template the session was started from
    pub workout_id: Option<Uuid>,
    /// Start time
    pub started_at: DateTime<Utc>,
    /// Completion time
    pub completed_at: Option<DateTime<Utc>>,
    /// Duration in minutes
    pub duration_minutes: Option<i64>,
    /// Estimated energy burned
    pub calories_burned: Option<f64>,
    /// Rate of perceived exertion, 1-10
    pub perceived_effort: Option<i64>,
    /// Exercises performed
    pub exercises: Vec<Exercise>,
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

/// Workouts planned for one day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyWorkoutPlan {
    /// Unique plan id
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Day the plan is for
    pub plan_date: NaiveDate,
    /// Workouts in order
    pub workout_ids: Vec<Uuid>,
    /// Planned rest day
    pub is_rest_day: bool,
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
