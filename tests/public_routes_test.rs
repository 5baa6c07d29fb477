// ABOUTME: Integration tests for unauthenticated endpoints: health probes and the waitlist
// ABOUTME: Also checks request id propagation through the middleware stack
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{app, create_test_resources};
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};
use wiremock::MockServer;

#[tokio::test]
async fn test_health_and_readiness() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;

    let health: Value = AxumTestRequest::get("/health")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(health["status"], "healthy");

    let ready: Value = AxumTestRequest::get("/ready")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(ready["database"], "ok");
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;

    let response = AxumTestRequest::get("/health")
        .header("x-request-id", "client-trace-1")
        .send(app(&resources))
        .await;
    assert_eq!(response.header("x-request-id").as_deref(), Some("client-trace-1"));

    let response = AxumTestRequest::get("/health").send(app(&resources)).await;
    assert!(response.header("x-request-id").unwrap().starts_with("req_"));
}

#[tokio::test]
async fn test_waitlist_join_is_idempotent_per_email() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;

    let first: Value = AxumTestRequest::post("/api/waitlist")
        .json(&json!({ "email": "Runner@Example.com", "source": "landing" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(first["email"], "runner@example.com");
    assert_eq!(first["source"], "landing");

    let second: Value = AxumTestRequest::post("/api/waitlist")
        .json(&json!({ "email": "  runner@EXAMPLE.com " }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(second["id"], first["id"]);

    AxumTestRequest::post("/api/waitlist")
        .json(&json!({ "email": "not-an-email" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let count: Value = AxumTestRequest::get("/api/waitlist/count")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    AxumTestRequest::get("/api/nothing-here")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
