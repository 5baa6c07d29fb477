// ABOUTME: Integration tests for linking X and LinkedIn accounts through OAuth
// ABOUTME: Provider token and profile endpoints are served by wiremock
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{
    app, create_test_resources, create_test_resources_with_config, signed_in_user, test_config,
};
use helpers::axum_test::AxumTestRequest;
use nora_health_server::resources::ServerResources;
use serde_json::{json, Value};
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_x_provider(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth/x/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "x-access-token",
            "token_type": "bearer",
            "expires_in": 7200,
            "refresh_token": "x-refresh-token",
            "scope": "tweet.read tweet.write users.read offline.access"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/2/users/me"))
        .and(header("authorization", "Bearer x-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "id": "42",
                "name": "Alice",
                "username": "alice_runs",
                "profile_image_url": "https://pbs.example.com/alice.jpg"
            }
        })))
        .mount(server)
        .await;
}

/// Start linking and return the issued state
async fn authorize(resources: &Arc<ServerResources>, token: &str, platform: &str) -> Value {
    AxumTestRequest::get(&format!("/api/accounts/{platform}/authorize"))
        .bearer(token)
        .send(app(resources))
        .await
        .assert_status(StatusCode::OK)
        .json()
}

fn query_value(authorization_url: &str, name: &str) -> Option<String> {
    Url::parse(authorization_url)
        .unwrap()
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn callback_uri(platform: &str, state: &str) -> String {
    format!(
        "/api/accounts/{platform}/callback?code=auth-code&state={}",
        urlencoding::encode(state)
    )
}

#[tokio::test]
async fn test_authorize_builds_provider_url() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, 1).await;

    let request = authorize(&resources, &token, "x").await;
    assert_eq!(request["platform"], "x");
    let url = request["authorization_url"].as_str().unwrap();
    assert!(url.starts_with(&format!("{}/oauth/x/authorize", server.uri())));
    assert_eq!(query_value(url, "client_id").as_deref(), Some("x-client"));
    assert_eq!(query_value(url, "response_type").as_deref(), Some("code"));
    assert_eq!(query_value(url, "code_challenge_method").as_deref(), Some("S256"));
    assert!(query_value(url, "code_challenge").is_some());
    assert!(query_value(url, "state").is_some());

    let request = authorize(&resources, &token, "linkedin").await;
    let url = request["authorization_url"].as_str().unwrap();
    assert!(query_value(url, "code_challenge").is_none());
    assert!(query_value(url, "state").is_some());
}

#[tokio::test]
async fn test_authorize_rejects_farcaster_and_anonymous() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, 1).await;

    AxumTestRequest::get("/api/accounts/farcaster/authorize")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    AxumTestRequest::get("/api/accounts/myspace/authorize")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    AxumTestRequest::get("/api/accounts/x/authorize")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_links_account_once_per_state() {
    let server = MockServer::start().await;
    mount_x_provider(&server).await;
    let resources = create_test_resources(&server.uri()).await;
    let (user, token) = signed_in_user(&resources, 1).await;

    let request = authorize(&resources, &token, "x").await;
    let state = query_value(request["authorization_url"].as_str().unwrap(), "state").unwrap();

    let account: Value = AxumTestRequest::get(&callback_uri("x", &state))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(account["platform"], "x");
    assert_eq!(account["platform_user_id"], "42");
    assert_eq!(account["username"], "alice_runs");
    assert_eq!(account["user_id"], user.id.to_string());

    let body: Value = AxumTestRequest::get(&callback_uri("x", &state))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .json();
    assert_eq!(body["error"]["code"], "AUTH_INVALID");

    let accounts: Value = AxumTestRequest::get("/api/accounts")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(accounts["accounts"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_callback_state_is_bound_to_platform() {
    let server = MockServer::start().await;
    mount_x_provider(&server).await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, 1).await;

    let request = authorize(&resources, &token, "x").await;
    let state = query_value(request["authorization_url"].as_str().unwrap(), "state").unwrap();

    AxumTestRequest::get(&callback_uri("linkedin", &state))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_callback_redirects_to_frontend() {
    let server = MockServer::start().await;
    mount_x_provider(&server).await;
    let mut config = test_config(&server.uri());
    config.frontend_url = Some("https://app.nora.test/".to_owned());
    let resources = create_test_resources_with_config(config).await;
    let (_user, token) = signed_in_user(&resources, 1).await;

    let request = authorize(&resources, &token, "x").await;
    let state = query_value(request["authorization_url"].as_str().unwrap(), "state").unwrap();

    let response = AxumTestRequest::get(&callback_uri("x", &state))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::SEE_OTHER);
    let location = response.header("location").unwrap();
    assert!(location.starts_with("https://app.nora.test/settings/accounts?linked=x&account_id="));

    // Replayed state lands on the same page with an error
    let response = AxumTestRequest::get(&callback_uri("x", &state))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::SEE_OTHER);
    let location = response.header("location").unwrap();
    assert!(location.contains("error="));
    assert!(location.ends_with("&platform=x"));
}

#[tokio::test]
async fn test_callback_provider_error() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;

    let body: Value = AxumTestRequest::get(
        "/api/accounts/x/callback?error=access_denied&error_description=User%20cancelled",
    )
    .send(app(&resources))
    .await
    .assert_status(StatusCode::BAD_REQUEST)
    .json();
    assert_eq!(body["error"]["message"], "User cancelled");

    AxumTestRequest::get("/api/accounts/x/callback?code=abc")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unlink_account() {
    let server = MockServer::start().await;
    mount_x_provider(&server).await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, 1).await;
    let (_other, other_token) = signed_in_user(&resources, 2).await;

    let request = authorize(&resources, &token, "x").await;
    let state = query_value(request["authorization_url"].as_str().unwrap(), "state").unwrap();
    let account: Value = AxumTestRequest::get(&callback_uri("x", &state))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    let uri = format!("/api/accounts/{}", account["id"].as_str().unwrap());

    AxumTestRequest::delete(&uri)
        .bearer(&other_token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    AxumTestRequest::delete(&uri)
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    AxumTestRequest::delete(&uri)
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let accounts: Value = AxumTestRequest::get("/api/accounts")
        .bearer(&token)
        .send(app(&resources))
        .await
        .json();
    assert!(accounts["accounts"].as_array().unwrap().is_empty());
}
