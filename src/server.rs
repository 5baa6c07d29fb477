// ABOUTME: HTTP server assembly: merges feature routers and applies the middleware stack
// ABOUTME: Serves until Ctrl-C or SIGTERM, then drains in-flight requests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderName, Response};
use axum::Router;
use nora_core::constants::limits::{MAX_REQUEST_BODY_BYTES, REQUEST_TIMEOUT_SECS};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn, Span};

use crate::errors::{AppError, AppResult};
use crate::middleware::{create_request_span, setup_cors, NoraRequestId, REQUEST_ID_HEADER};
use crate::resources::ServerResources;
use crate::routes::{
    AccountRoutes, AuthRoutes, ConversationRoutes, HealthProfileRoutes, HealthRoutes, MealRoutes,
    PostRoutes, SignerRoutes, UserRoutes, WaitlistRoutes, WorkoutRoutes,
};

fn record_response<B>(response: &Response<B>, latency: Duration, span: &Span) {
    span.record("status_code", response.status().as_u16());
    debug!(
        status = response.status().as_u16(),
        latency_ms = latency.as_millis(),
        "Request finished"
    );
}

/// The Nora Health HTTP API server
pub struct NoraHealthServer {
    resources: Arc<ServerResources>,
}

impl NoraHealthServer {
    /// Create a server over shared resources
    #[must_use]
    pub const fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Build the complete router with every route and middleware layer
    #[must_use]
    pub fn router(&self) -> Router {
        let resources = &self.resources;
        let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

        Router::new()
            .merge(HealthRoutes::routes(resources.clone()))
            .merge(AuthRoutes::routes(resources.clone()))
            .merge(UserRoutes::routes(resources.clone()))
            .merge(AccountRoutes::routes(resources.clone()))
            .merge(SignerRoutes::routes(resources.clone()))
            .merge(PostRoutes::routes(resources.clone()))
            .merge(HealthProfileRoutes::routes(resources.clone()))
            .merge(MealRoutes::routes(resources.clone()))
            .merge(WorkoutRoutes::routes(resources.clone()))
            .merge(ConversationRoutes::routes(resources.clone()))
            .merge(WaitlistRoutes::routes(resources.clone()))
            // Last layer added runs first
            .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
            .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
            .layer(setup_cors(&resources.config.cors))
            .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(create_request_span::<Body>)
                    .on_response(record_response::<Body>),
            )
            .layer(SetRequestIdLayer::new(request_id_header, NoraRequestId))
    }

    /// Bind the configured address and serve until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the server fails
    pub async fn run(&self, port: u16) -> AppResult<()> {
        let addr = format!("{}:{port}", self.resources.config.host);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
        info!(%addr, "Nora Health API listening");

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::internal(format!("Server error: {e}")));

        info!("Nora Health API stopped");
        result
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
