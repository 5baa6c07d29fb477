// ABOUTME: Route module organization for the Nora Health REST API
// ABOUTME: Each feature exposes a *Routes type whose routes() builds its axum Router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! HTTP route handlers
//!
//! Handlers authenticate, parse path and query parameters, call one service
//! function, and serialize the result. Error responses come from
//! [`crate::errors::AppError`]'s `IntoResponse` implementation.

use axum::http::HeaderMap;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::middleware::AuthResult;
use crate::pagination::{Cursor, PaginationParams};
use crate::resources::ServerResources;
use crate::services::validation::parse_date;

/// Social account linking routes
pub mod accounts;
/// Sign-in, refresh and logout routes
pub mod auth;
/// Coaching conversation routes
pub mod conversations;
/// Liveness and readiness probes
pub mod health;
/// Health profile routes
pub mod health_profiles;
/// Meal and meal plan routes
pub mod meals;
/// Post routes
pub mod posts;
/// Neynar signer routes
pub mod signers;
/// Current user routes
pub mod users;
/// Waitlist routes
pub mod waitlist;
/// Workout, session and workout plan routes
pub mod workouts;

pub use accounts::AccountRoutes;
pub use auth::AuthRoutes;
pub use conversations::ConversationRoutes;
pub use health::HealthRoutes;
pub use health_profiles::HealthProfileRoutes;
pub use meals::MealRoutes;
pub use posts::PostRoutes;
pub use signers::SignerRoutes;
pub use users::UserRoutes;
pub use waitlist::WaitlistRoutes;
pub use workouts::WorkoutRoutes;

/// Authenticate the caller of a request
///
/// # Errors
///
/// Returns an authentication error when credentials are missing or invalid
pub async fn authenticate(headers: &HeaderMap, resources: &ServerResources) -> AppResult<AuthResult> {
    resources
        .auth_middleware
        .authenticate_request_with_headers(headers)
        .await
}

/// Parse a UUID path segment
///
/// # Errors
///
/// Returns invalid input naming the resource
pub fn parse_id(value: &str, resource: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::invalid_input(format!("Invalid {resource} id: {value}")))
}

/// Path segment that is either a plan date or a plan id
pub enum DateOrId {
    /// `YYYY-MM-DD`
    Date(NaiveDate),
    /// Plan id
    Id(Uuid),
}

impl DateOrId {
    /// Parse a segment, trying the date form first
    ///
    /// # Errors
    ///
    /// Returns invalid input when the segment is neither form
    pub fn parse(value: &str) -> AppResult<Self> {
        if let Ok(date) = parse_date("date", value) {
            return Ok(Self::Date(date));
        }
        Uuid::parse_str(value.trim()).map(Self::Id).map_err(|_| {
            AppError::invalid_input(format!("Expected a date (YYYY-MM-DD) or an id: {value}"))
        })
    }
}

/// `?cursor=&limit=` query parameters
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
    /// Page size
    pub limit: Option<usize>,
}

impl ListQuery {
    /// Convert into clamped pagination parameters
    #[must_use]
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(
            self.cursor
                .as_ref()
                .filter(|c| !c.is_empty())
                .map(|c| Cursor::from(c.clone())),
            self.limit,
        )
    }
}

/// `?from=&to=` date range query parameters
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    /// Inclusive start date
    pub from: Option<String>,
    /// Inclusive end date
    pub to: Option<String>,
}

impl DateRangeQuery {
    /// Parse both bounds
    ///
    /// # Errors
    ///
    /// Returns invalid input for a malformed date
    pub fn parse(&self) -> AppResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        let from = self.from.as_deref().map(|d| parse_date("from", d)).transpose()?;
        let to = self.to.as_deref().map(|d| parse_date("to", d)).transpose()?;
        Ok((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_or_id() {
        assert!(matches!(DateOrId::parse("2025-03-01"), Ok(DateOrId::Date(_))));
        let id = Uuid::new_v4();
        assert!(matches!(DateOrId::parse(&id.to_string()), Ok(DateOrId::Id(parsed)) if parsed == id));
        assert!(DateOrId::parse("yesterday").is_err());
    }

    #[test]
    fn test_list_query_clamps_limit() {
        let query = ListQuery {
            cursor: Some(String::new()),
            limit: Some(10_000),
        };
        let params = query.pagination();
        assert!(params.cursor.is_none());
        assert_eq!(params.limit, nora_core::constants::limits::MAX_PAGE_SIZE);
    }
}
