// ABOUTME: Workout templates, logged workout sessions and daily workout plans
// ABOUTME: Sessions copy their workout's exercises and can be completed exactly once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use nora_core::constants::health_bounds::{MAX_MEAL_CALORIES, MAX_WORKOUT_MINUTES};
use nora_core::constants::limits::{MAX_MESSAGE_LENGTH, MAX_NAME_LENGTH};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::validation::{
    check_max_len, check_non_negative, check_range_f64, check_range_i64, normalize_optional,
    parse_date, require_text,
};
use crate::database::{Database, WorkoutRepository};
use crate::errors::{AppError, AppResult};
use crate::models::{
    DailyWorkoutPlan, Difficulty, Exercise, Workout, WorkoutSession, WorkoutType,
};
use crate::pagination::{CursorPage, PaginationParams};

const MAX_EXERCISES: usize = 100;
const MIN_EFFORT: i64 = 1;
const MAX_EFFORT: i64 = 10;

/// Workout body used for create and replace
#[derive(Debug, Clone, Deserialize)]
pub struct WorkoutInput {
    /// Workout name
    pub name: String,
    /// Longer description
    pub description: Option<String>,
    /// Kind of training
    pub workout_type: WorkoutType,
    /// Intended level
    pub difficulty: Difficulty,
    /// Planned duration in minutes
    pub duration_minutes: i64,
    /// Exercises in order
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

/// Session start body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartSessionRequest {
    /// Workout being performed; its exercises are copied into the session
    pub workout_id: Option<Uuid>,
    /// Exercises for an ad-hoc session without a workout
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Session completion body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteSessionRequest {
    /// Minutes trained; defaults to the time since the session started
    pub duration_minutes: Option<i64>,
    /// Estimated energy burned in kcal
    pub calories_burned: Option<f64>,
    /// Rate of perceived exertion, 1 to 10
    pub perceived_effort: Option<i64>,
    /// Free-form notes; keeps the start notes when absent
    pub notes: Option<String>,
}

/// Workout plan body
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkoutPlanRequest {
    /// Day the plan is for (`YYYY-MM-DD`)
    pub plan_date: String,
    /// Workouts planned for the day
    #[serde(default)]
    pub workout_ids: Vec<Uuid>,
    /// Whether the day is a rest day
    #[serde(default)]
    pub is_rest_day: bool,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Plan with resolved workouts
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutPlanView {
    /// Stored plan
    pub plan: DailyWorkoutPlan,
    /// Active workouts of the plan in plan order
    pub workouts: Vec<Workout>,
    /// Sum of the planned workout durations
    pub total_minutes: i64,
}

fn validate_exercises(exercises: Vec<Exercise>) -> AppResult<Vec<Exercise>> {
    if exercises.len() > MAX_EXERCISES {
        return Err(AppError::invalid_input(format!(
            "A workout can have at most {MAX_EXERCISES} exercises"
        )));
    }
    exercises
        .into_iter()
        .map(|exercise| {
            let name = require_text("Exercise name", &exercise.name, MAX_NAME_LENGTH)?;
            check_non_negative("Exercise weight", exercise.weight_kg)?;
            Ok(Exercise {
                name,
                notes: normalize_optional(exercise.notes),
                ..exercise
            })
        })
        .collect()
}

fn build_workout(
    user_id: Uuid,
    id: Uuid,
    input: WorkoutInput,
    now: DateTime<Utc>,
) -> AppResult<Workout> {
    let name = require_text("Name", &input.name, MAX_NAME_LENGTH)?;
    let description = normalize_optional(input.description);
    check_max_len("Description", description.as_deref(), MAX_MESSAGE_LENGTH)?;
    check_range_i64("Duration", Some(input.duration_minutes), 1, MAX_WORKOUT_MINUTES)?;

    Ok(Workout {
        id,
        user_id,
        name,
        description,
        workout_type: input.workout_type,
        difficulty: input.difficulty,
        duration_minutes: input.duration_minutes,
        exercises: validate_exercises(input.exercises)?,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

/// Add a workout template
///
/// # Errors
///
/// Returns invalid input or out-of-range errors for bad fields
pub async fn create_workout(
    database: &Database,
    user_id: Uuid,
    input: WorkoutInput,
    now: DateTime<Utc>,
) -> AppResult<Workout> {
    let workout = build_workout(user_id, Uuid::new_v4(), input, now)?;
    database.create_workout(&workout).await?;
    Ok(workout)
}

/// Active workout owned by the user
///
/// # Errors
///
/// Returns not found if the user has no such active workout
pub async fn get_workout(database: &Database, user_id: Uuid, workout_id: Uuid) -> AppResult<Workout> {
    database
        .get_workout(user_id, workout_id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout"))
}

/// Page of workouts, newest first
///
/// # Errors
///
/// Returns invalid input for a malformed cursor and database errors
pub async fn list_workouts(
    database: &Database,
    user_id: Uuid,
    params: &PaginationParams,
) -> AppResult<CursorPage<Workout>> {
    database.list_workouts(user_id, params).await
}

/// Replace every editable field of a workout
///
/// # Errors
///
/// Returns not found for an unknown workout and invalid input for bad fields
pub async fn update_workout(
    database: &Database,
    user_id: Uuid,
    workout_id: Uuid,
    input: WorkoutInput,
    now: DateTime<Utc>,
) -> AppResult<Workout> {
    let existing = get_workout(database, user_id, workout_id).await?;
    let mut workout = build_workout(user_id, workout_id, input, now)?;
    workout.created_at = existing.created_at;
    database.update_workout(&workout).await?;
    Ok(workout)
}

/// Soft-delete a workout
///
/// # Errors
///
/// Returns not found if the user has no such active workout
pub async fn delete_workout(
    database: &Database,
    user_id: Uuid,
    workout_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database.soft_delete_workout(user_id, workout_id, now).await? {
        return Err(AppError::not_found("Workout"));
    }
    Ok(())
}

/// Start logging a session, optionally from a workout template
///
/// # Errors
///
/// Returns not found if `workout_id` is not an active workout of the user
pub async fn start_session(
    database: &Database,
    user_id: Uuid,
    request: StartSessionRequest,
    now: DateTime<Utc>,
) -> AppResult<WorkoutSession> {
    let exercises = match request.workout_id {
        Some(workout_id) => get_workout(database, user_id, workout_id).await?.exercises,
        None => validate_exercises(request.exercises)?,
    };
    let notes = normalize_optional(request.notes);
    check_max_len("Notes", notes.as_deref(), MAX_MESSAGE_LENGTH)?;

    let session = WorkoutSession {
        id: Uuid::new_v4(),
        user_id,
        workout_id: request.workout_id,
        started_at: now,
        completed_at: None,
        duration_minutes: None,
        calories_burned: None,
        perceived_effort: None,
        exercises,
        notes,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    database.create_session(&session).await?;
    info!(user.id = %user_id, session.id = %session.id, "Workout session started");
    Ok(session)
}

/// Minutes between start and `now`, clamped to the supported range
fn elapsed_minutes(started_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - started_at).num_minutes().clamp(0, MAX_WORKOUT_MINUTES)
}

/// Mark a session completed
///
/// # Errors
///
/// Returns not found for an unknown session, out-of-range errors for bad
/// values, and a conflict if the session was already completed
pub async fn complete_session(
    database: &Database,
    user_id: Uuid,
    session_id: Uuid,
    request: CompleteSessionRequest,
    now: DateTime<Utc>,
) -> AppResult<WorkoutSession> {
    check_range_i64("Duration", request.duration_minutes, 0, MAX_WORKOUT_MINUTES)?;
    check_range_f64("Calories burned", request.calories_burned, 0.0, MAX_MEAL_CALORIES)?;
    check_range_i64("Perceived effort", request.perceived_effort, MIN_EFFORT, MAX_EFFORT)?;

    let mut session = get_session(database, user_id, session_id).await?;
    if session.completed_at.is_some() {
        return Err(AppError::conflict("Session is already completed"));
    }

    session.completed_at = Some(now);
    session.duration_minutes = Some(
        request
            .duration_minutes
            .unwrap_or_else(|| elapsed_minutes(session.started_at, now)),
    );
    session.calories_burned = request.calories_burned;
    session.perceived_effort = request.perceived_effort;
    if let Some(notes) = request.notes {
        let notes = normalize_optional(Some(notes));
        check_max_len("Notes", notes.as_deref(), MAX_MESSAGE_LENGTH)?;
        session.notes = notes;
    }
    session.updated_at = now;

    // Guarded update; a concurrent completion leaves no row to change
    if !database.complete_session(&session).await? {
        return Err(AppError::conflict("Session is already completed"));
    }
    info!(
        user.id = %user_id,
        session.id = %session.id,
        duration_minutes = session.duration_minutes,
        "Workout session completed"
    );
    Ok(session)
}

/// Active session owned by the user
///
/// # Errors
///
/// Returns not found if the user has no such active session
pub async fn get_session(
    database: &Database,
    user_id: Uuid,
    session_id: Uuid,
) -> AppResult<WorkoutSession> {
    database
        .get_session(user_id, session_id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout session"))
}

/// Page of sessions, newest first
///
/// # Errors
///
/// Returns invalid input for a malformed cursor and database errors
pub async fn list_sessions(
    database: &Database,
    user_id: Uuid,
    params: &PaginationParams,
) -> AppResult<CursorPage<WorkoutSession>> {
    database.list_sessions(user_id, params).await
}

/// Soft-delete a session
///
/// # Errors
///
/// Returns not found if the user has no such active session
pub async fn delete_session(
    database: &Database,
    user_id: Uuid,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database.soft_delete_session(user_id, session_id, now).await? {
        return Err(AppError::not_found("Workout session"));
    }
    Ok(())
}

fn plan_view(plan: DailyWorkoutPlan, workouts: &[Workout]) -> WorkoutPlanView {
    let ordered: Vec<Workout> = plan
        .workout_ids
        .iter()
        .filter_map(|id| workouts.iter().find(|w| w.id == *id).cloned())
        .collect();
    let total_minutes = ordered.iter().map(|w| w.duration_minutes).sum();
    WorkoutPlanView {
        plan,
        workouts: ordered,
        total_minutes,
    }
}

/// Create the workout plan for a day
///
/// # Errors
///
/// Returns invalid input for a bad date, a rest day with workouts, or a
/// workout the user does not own, and a conflict when the day already has an
/// active plan
pub async fn create_workout_plan(
    database: &Database,
    user_id: Uuid,
    request: CreateWorkoutPlanRequest,
    now: DateTime<Utc>,
) -> AppResult<WorkoutPlanView> {
    let plan_date = parse_date("plan_date", &request.plan_date)?;
    if request.is_rest_day && !request.workout_ids.is_empty() {
        return Err(AppError::invalid_input(
            "A rest day cannot include workouts",
        ));
    }
    let notes = normalize_optional(request.notes);
    check_max_len("Notes", notes.as_deref(), MAX_MESSAGE_LENGTH)?;

    let unique_ids: Vec<Uuid> = request
        .workout_ids
        .iter()
        .copied()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let found = database.get_workouts_by_ids(user_id, &unique_ids).await?;
    if found.len() != unique_ids.len() {
        return Err(AppError::invalid_input(
            "Every planned workout must be one of your active workouts",
        ));
    }

    let plan = DailyWorkoutPlan {
        id: Uuid::new_v4(),
        user_id,
        plan_date,
        workout_ids: request.workout_ids,
        is_rest_day: request.is_rest_day,
        notes,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };
    database.create_workout_plan(&plan).await?;
    info!(user.id = %user_id, plan.date = %plan_date, rest_day = plan.is_rest_day, "Workout plan created");
    Ok(plan_view(plan, &found))
}

async fn resolve(database: &Database, plan: DailyWorkoutPlan) -> AppResult<WorkoutPlanView> {
    let workouts = database
        .get_workouts_by_ids(plan.user_id, &plan.workout_ids)
        .await?;
    Ok(plan_view(plan, &workouts))
}

/// Plan for a day with resolved workouts
///
/// # Errors
///
/// Returns not found if the day has no active plan
pub async fn get_workout_plan_by_date(
    database: &Database,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<WorkoutPlanView> {
    let plan = database
        .get_workout_plan_by_date(user_id, date)
        .await?
        .ok_or_else(|| AppError::not_found("Workout plan"))?;
    resolve(database, plan).await
}

/// Plan by id with resolved workouts
///
/// # Errors
///
/// Returns not found if the user has no such active plan
pub async fn get_workout_plan(
    database: &Database,
    user_id: Uuid,
    plan_id: Uuid,
) -> AppResult<WorkoutPlanView> {
    let plan = database
        .get_workout_plan(user_id, plan_id)
        .await?
        .ok_or_else(|| AppError::not_found("Workout plan"))?;
    resolve(database, plan).await
}

/// Plans in an inclusive date range, oldest first
///
/// # Errors
///
/// Returns invalid input when `from` is after `to`
pub async fn list_workout_plans(
    database: &Database,
    user_id: Uuid,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> AppResult<Vec<DailyWorkoutPlan>> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::invalid_input("'from' must not be after 'to'"));
        }
    }
    database.list_workout_plans(user_id, from, to).await
}

/// Soft-delete a plan, freeing its date
///
/// # Errors
///
/// Returns not found if the user has no such active plan
pub async fn delete_workout_plan(
    database: &Database,
    user_id: Uuid,
    plan_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !database.soft_delete_workout_plan(user_id, plan_id, now).await? {
        return Err(AppError::not_found("Workout plan"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn squat() -> Exercise {
        Exercise {
            name: " Back squat ".to_owned(),
            sets: Some(5),
            reps: Some(5),
            duration_seconds: None,
            weight_kg: Some(100.0),
            notes: Some(String::new()),
        }
    }

    fn input(duration_minutes: i64) -> WorkoutInput {
        WorkoutInput {
            name: "Leg day".to_owned(),
            description: None,
            workout_type: WorkoutType::Strength,
            difficulty: Difficulty::Intermediate,
            duration_minutes,
            exercises: vec![squat()],
        }
    }

    #[test]
    fn test_build_workout_normalizes_exercises() {
        let workout = build_workout(Uuid::nil(), Uuid::new_v4(), input(45), Utc::now()).unwrap();
        assert_eq!(workout.exercises[0].name, "Back squat");
        assert!(workout.exercises[0].notes.is_none());
        assert_eq!(workout.exercises[0].sets, Some(5));
    }

    #[test]
    fn test_duration_bounds() {
        assert!(build_workout(Uuid::nil(), Uuid::new_v4(), input(0), Utc::now()).is_err());
        assert!(build_workout(Uuid::nil(), Uuid::new_v4(), input(1), Utc::now()).is_ok());
        assert!(build_workout(Uuid::nil(), Uuid::new_v4(), input(1440), Utc::now()).is_ok());
        assert!(build_workout(Uuid::nil(), Uuid::new_v4(), input(1441), Utc::now()).is_err());
    }

    #[test]
    fn test_exercise_rules() {
        let mut negative = squat();
        negative.weight_kg = Some(-5.0);
        assert!(validate_exercises(vec![negative]).is_err());

        let mut unnamed = squat();
        unnamed.name = "  ".to_owned();
        assert!(validate_exercises(vec![unnamed]).is_err());
    }

    #[test]
    fn test_elapsed_minutes_is_clamped() {
        let start = Utc::now();
        assert_eq!(elapsed_minutes(start, start + Duration::minutes(42)), 42);
        assert_eq!(elapsed_minutes(start, start - Duration::minutes(5)), 0);
        assert_eq!(
            elapsed_minutes(start, start + Duration::days(3)),
            MAX_WORKOUT_MINUTES
        );
    }
}
