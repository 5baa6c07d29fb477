// ABOUTME: Route handlers for workouts, workout sessions and daily workout plans
// ABOUTME: Sessions are started and completed through dedicated endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use super::{authenticate, parse_id, DateOrId, DateRangeQuery, ListQuery};
use crate::database::now;
use crate::errors::AppError;
use crate::resources::ServerResources;
use crate::services::workouts::{
    self as workout_service, CompleteSessionRequest, CreateWorkoutPlanRequest,
    StartSessionRequest, WorkoutInput,
};

/// Workout, session and workout plan routes
pub struct WorkoutRoutes;

impl WorkoutRoutes {
    /// Create all workout routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/workouts",
                get(Self::handle_list_workouts).post(Self::handle_create_workout),
            )
            .route(
                "/api/workouts/:id",
                get(Self::handle_get_workout)
                    .put(Self::handle_update_workout)
                    .delete(Self::handle_delete_workout),
            )
            .route(
                "/api/workout-sessions",
                get(Self::handle_list_sessions).post(Self::handle_start_session),
            )
            .route(
                "/api/workout-sessions/:id",
                get(Self::handle_get_session).delete(Self::handle_delete_session),
            )
            .route(
                "/api/workout-sessions/:id/complete",
                post(Self::handle_complete_session),
            )
            .route(
                "/api/workout-plans",
                get(Self::handle_list_plans).post(Self::handle_create_plan),
            )
            .route(
                "/api/workout-plans/:key",
                get(Self::handle_get_plan).delete(Self::handle_delete_plan),
            )
            .with_state(resources)
    }

    async fn handle_create_workout(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(input): Json<WorkoutInput>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let workout =
            workout_service::create_workout(&resources.database, auth.user_id, input, now())
                .await?;
        Ok((StatusCode::CREATED, Json(workout)).into_response())
    }

    async fn handle_list_workouts(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let page = workout_service::list_workouts(
            &resources.database,
            auth.user_id,
            &query.pagination(),
        )
        .await?;
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    async fn handle_get_workout(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let workout_id = parse_id(&id, "workout")?;
        let workout =
            workout_service::get_workout(&resources.database, auth.user_id, workout_id).await?;
        Ok((StatusCode::OK, Json(workout)).into_response())
    }

    async fn handle_update_workout(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(input): Json<WorkoutInput>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let workout_id = parse_id(&id, "workout")?;
        let workout = workout_service::update_workout(
            &resources.database,
            auth.user_id,
            workout_id,
            input,
            now(),
        )
        .await?;
        Ok((StatusCode::OK, Json(workout)).into_response())
    }

    async fn handle_delete_workout(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let workout_id = parse_id(&id, "workout")?;
        workout_service::delete_workout(&resources.database, auth.user_id, workout_id, now())
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_start_session(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<StartSessionRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let session =
            workout_service::start_session(&resources.database, auth.user_id, request, now())
                .await?;
        Ok((StatusCode::CREATED, Json(session)).into_response())
    }

    async fn handle_list_sessions(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListQuery>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let page = workout_service::list_sessions(
            &resources.database,
            auth.user_id,
            &query.pagination(),
        )
        .await?;
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    async fn handle_get_session(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let session_id = parse_id(&id, "session")?;
        let session =
            workout_service::get_session(&resources.database, auth.user_id, session_id).await?;
        Ok((StatusCode::OK, Json(session)).into_response())
    }

    async fn handle_complete_session(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(request): Json<CompleteSessionRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let session_id = parse_id(&id, "session")?;
        let session = workout_service::complete_session(
            &resources.database,
            auth.user_id,
            session_id,
            request,
            now(),
        )
        .await?;
        Ok((StatusCode::OK, Json(session)).into_response())
    }

    async fn handle_delete_session(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let session_id = parse_id(&id, "session")?;
        workout_service::delete_session(&resources.database, auth.user_id, session_id, now())
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_create_plan(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateWorkoutPlanRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let view =
            workout_service::create_workout_plan(&resources.database, auth.user_id, request, now())
                .await?;
        Ok((StatusCode::CREATED, Json(view)).into_response())
    }

    async fn handle_list_plans(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(range): Query<DateRangeQuery>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let (from, to) = range.parse()?;
        let plans =
            workout_service::list_workout_plans(&resources.database, auth.user_id, from, to)
                .await?;
        Ok((StatusCode::OK, Json(json!({ "plans": plans }))).into_response())
    }

    async fn handle_get_plan(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(key): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let database = &resources.database;
        let view = match DateOrId::parse(&key)? {
            DateOrId::Date(date) => {
                workout_service::get_workout_plan_by_date(database, auth.user_id, date).await?
            }
            DateOrId::Id(plan_id) => {
                workout_service::get_workout_plan(database, auth.user_id, plan_id).await?
            }
        };
        Ok((StatusCode::OK, Json(view)).into_response())
    }

    async fn handle_delete_plan(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(key): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let plan_id = match DateOrId::parse(&key)? {
            DateOrId::Id(plan_id) => plan_id,
            DateOrId::Date(date) => {
                workout_service::get_workout_plan_by_date(&resources.database, auth.user_id, date)
                    .await?
                    .plan
                    .id
            }
        };
        workout_service::delete_workout_plan(&resources.database, auth.user_id, plan_id, now())
            .await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
