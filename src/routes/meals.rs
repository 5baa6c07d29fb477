// ABOUTME: Route handlers for the meal library and daily meal plans
// ABOUTME: Meal plans are addressed by date or by id and carry allergen warnings
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{authenticate, parse_id, DateOrId, DateRangeQuery, ListQuery};
use crate::database::now;
use crate::errors::AppError;
use crate::models::MealType;
use crate::resources::ServerResources;
use crate::services::meals::{self as meal_service, CreateMealPlanRequest, MealInput};

/// `GET /api/meals` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListMealsQuery {
    /// Only meals of this type
    pub meal_type: Option<String>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
    /// Page size
    pub limit: Option<usize>,
}

/// Meal and meal plan routes
pub struct MealRoutes;

impl MealRoutes {
    /// Create all meal routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/api/meals",
                get(Self::handle_list_meals).post(Self::handle_create_meal),
            )
            .route(
                "/api/meals/:id",
                get(Self::handle_get_meal)
                    .put(Self::handle_update_meal)
                    .delete(Self::handle_delete_meal),
            )
            .route(
                "/api/meal-plans",
                get(Self::handle_list_plans).post(Self::handle_create_plan),
            )
            .route(
                "/api/meal-plans/:key",
                get(Self::handle_get_plan).delete(Self::handle_delete_plan),
            )
            .with_state(resources)
    }

    async fn handle_create_meal(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(input): Json<MealInput>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let meal = meal_service::create_meal(&resources.database, auth.user_id, input, now()).await?;
        Ok((StatusCode::CREATED, Json(meal)).into_response())
    }

    async fn handle_list_meals(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<ListMealsQuery>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let meal_type = query
            .meal_type
            .as_deref()
            .map(MealType::from_str)
            .transpose()?;
        let params = ListQuery {
            cursor: query.cursor,
            limit: query.limit,
        }
        .pagination();
        let page =
            meal_service::list_meals(&resources.database, auth.user_id, meal_type, &params).await?;
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    async fn handle_get_meal(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let meal_id = parse_id(&id, "meal")?;
        let meal = meal_service::get_meal(&resources.database, auth.user_id, meal_id).await?;
        Ok((StatusCode::OK, Json(meal)).into_response())
    }

    async fn handle_update_meal(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
        Json(input): Json<MealInput>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let meal_id = parse_id(&id, "meal")?;
        let meal =
            meal_service::update_meal(&resources.database, auth.user_id, meal_id, input, now())
                .await?;
        Ok((StatusCode::OK, Json(meal)).into_response())
    }

    async fn handle_delete_meal(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(id): Path<String>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let meal_id = parse_id(&id, "meal")?;
        meal_service::delete_meal(&resources.database, auth.user_id, meal_id, now()).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }

    async fn handle_create_plan(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateMealPlanRequest>,
    ) -> Result<Response, AppError> {
        let auth = authenticate(&headers, &resources).await?;
        let view =
            meal_service::create_meal_plan(&resources.database, auth.user_id, request, now())
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
            meal_service::list_meal_plans(&resources.database, auth.user_id, from, to).await?;
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
                meal_service::get_meal_plan_by_date(database, auth.user_id, date).await?
            }
            DateOrId::Id(plan_id) => {
                meal_service::get_meal_plan(database, auth.user_id, plan_id).await?
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
                meal_service::get_meal_plan_by_date(&resources.database, auth.user_id, date)
                    .await?
                    .plan
                    .id
            }
        };
        meal_service::delete_meal_plan(&resources.database, auth.user_id, plan_id, now()).await?;
        Ok(StatusCode::NO_CONTENT.into_response())
    }
}
