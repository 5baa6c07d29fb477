// ABOUTME: Liveness and readiness probes for load balancers and uptime monitors
// ABOUTME: /health never touches dependencies; /ready pings the database
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use nora_core::constants::service_names::NORA_HEALTH_SERVER;
use serde::Serialize;

use crate::resources::ServerResources;

/// `GET /health` body
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Always `healthy` while the process serves requests
    pub status: &'static str,
    /// Service name
    pub service: &'static str,
    /// Crate version
    pub version: &'static str,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// `GET /ready` body
#[derive(Debug, Serialize)]
pub struct ReadinessStatus {
    /// `ready` or `not_ready`
    pub status: &'static str,
    /// `ok` or `unavailable`
    pub database: &'static str,
    /// Server clock
    pub timestamp: DateTime<Utc>,
}

/// Liveness and readiness routes
pub struct HealthRoutes;

impl HealthRoutes {
    /// `/health` and `/ready`
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/health", get(Self::handle_health))
            .route("/ready", get(Self::handle_ready))
            .with_state(resources)
    }

    async fn handle_health() -> Json<HealthStatus> {
        Json(HealthStatus {
            status: "healthy",
            service: NORA_HEALTH_SERVER,
            version: env!("CARGO_PKG_VERSION"),
            timestamp: Utc::now(),
        })
    }

    async fn handle_ready(
        State(resources): State<Arc<ServerResources>>,
    ) -> (StatusCode, Json<ReadinessStatus>) {
        let (code, status, database) = match resources.database.ping().await {
            Ok(()) => (StatusCode::OK, "ready", "ok"),
            Err(e) => {
                tracing::error!(error = %e, "Readiness check failed");
                (StatusCode::SERVICE_UNAVAILABLE, "not_ready", "unavailable")
            }
        };
        (
            code,
            Json(ReadinessStatus {
                status,
                database,
                timestamp: Utc::now(),
            }),
        )
    }
}
