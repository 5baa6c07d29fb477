// ABOUTME: Integration tests for post drafts, history and multi-platform publishing
// ABOUTME: Neynar and the X API are replaced by a wiremock server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{app, create_test_resources, link_oauth_account, mount_neynar_cast, signed_in_user};
use helpers::axum_test::AxumTestRequest;
use nora_health_server::{
    database::{AccountRepository, SignerRepository},
    errors::ErrorCode,
    models::{ConnectedAccount, NeynarSigner, SignerStatus, SocialPlatform, StoredOAuthToken},
    resources::ServerResources,
    services::accounts::access_token_for,
};
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FID: i64 = 777;

async fn seed_approved_signer(resources: &ServerResources, user_id: Uuid) {
    let now = Utc::now();
    resources
        .database
        .upsert_signer(&NeynarSigner {
            id: Uuid::new_v4(),
            user_id,
            signer_uuid: format!("signer-{user_id}"),
            public_key: "0xabcdef".to_owned(),
            fid: Some(FID),
            status: SignerStatus::Approved,
            approval_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await
        .unwrap()
        .expect("signer should be stored");
}

async fn create_post(resources: &Arc<ServerResources>, token: &str, platforms: Value) -> Value {
    AxumTestRequest::post("/api/posts")
        .bearer(token)
        .json(&json!({ "content": "Morning run: 10k done", "platforms": platforms }))
        .send(app(resources))
        .await
        .assert_status(StatusCode::CREATED)
        .json()
}

/// Replace the stored grant of `account`
async fn store_grant(
    resources: &ServerResources,
    account: &ConnectedAccount,
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in: Duration,
) {
    let now = Utc::now();
    resources
        .database
        .upsert_oauth_token(&StoredOAuthToken {
            connected_account_id: account.id,
            access_token: resources.cipher.encrypt(access_token).unwrap(),
            refresh_token: refresh_token.map(|t| resources.cipher.encrypt(t).unwrap()),
            token_type: "Bearer".to_owned(),
            scope: None,
            expires_at: Some(now + expires_in),
            updated_at: now,
        })
        .await
        .unwrap();
}

fn platform_row<'a>(post: &'a Value, platform: &str) -> &'a Value {
    post["platforms"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["platform"] == platform)
        .unwrap_or_else(|| panic!("no {platform} delivery row"))
}

#[tokio::test]
async fn test_create_draft() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    let (user, token) = signed_in_user(&resources, FID).await;

    let post = create_post(&resources, &token, json!(["farcaster"])).await;
    assert_eq!(post["status"], "draft");
    assert_eq!(post["user_id"], user.id.to_string());
    assert_eq!(post["platforms"].as_array().unwrap().len(), 1);
    assert_eq!(platform_row(&post, "farcaster")["status"], "pending");

    let fetched: Value = AxumTestRequest::get(&format!("/api/posts/{}", post["id"].as_str().unwrap()))
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(fetched["content"], "Morning run: 10k done");
}

#[tokio::test]
async fn test_create_rejects_unlinked_platform_and_bad_input() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, FID).await;

    let body: Value = AxumTestRequest::post("/api/posts")
        .bearer(&token)
        .json(&json!({ "content": "hello", "platforms": ["x"] }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST)
        .json();
    assert_eq!(body["error"]["code"], "INVALID_INPUT");

    AxumTestRequest::post("/api/posts")
        .bearer(&token)
        .json(&json!({ "content": "   ", "platforms": ["farcaster"] }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    AxumTestRequest::post("/api/posts")
        .bearer(&token)
        .json(&json!({ "content": "hello", "platforms": [] }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_publish_to_farcaster() {
    let server = MockServer::start().await;
    mount_neynar_cast(&server, "0xcafe", "alice").await;
    let resources = create_test_resources(&server.uri()).await;
    let (user, token) = signed_in_user(&resources, FID).await;
    seed_approved_signer(&resources, user.id).await;

    let post = create_post(&resources, &token, json!(["farcaster"])).await;
    let id = post["id"].as_str().unwrap();

    let published: Value = AxumTestRequest::post(&format!("/api/posts/{id}/publish"))
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(published["status"], "published");
    assert!(published["published_at"].is_string());
    let row = platform_row(&published, "farcaster");
    assert_eq!(row["status"], "published");
    assert_eq!(row["external_post_id"], "0xcafe");
    assert_eq!(row["external_url"], "https://warpcast.com/alice/0xcafe");

    // A fully published post cannot be published or edited again
    let body: Value = AxumTestRequest::post(&format!("/api/posts/{id}/publish"))
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::CONFLICT)
        .json();
    assert_eq!(body["error"]["code"], "RESOURCE_CONFLICT");

    AxumTestRequest::patch(&format!("/api/posts/{id}"))
        .bearer(&token)
        .json(&json!({ "content": "edited" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_publish_without_signer_records_failure() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, FID).await;

    let post = create_post(&resources, &token, json!(["farcaster"])).await;
    let published: Value =
        AxumTestRequest::post(&format!("/api/posts/{}/publish", post["id"].as_str().unwrap()))
            .bearer(&token)
            .send(app(&resources))
            .await
            .assert_status(StatusCode::OK)
            .json();
    assert_eq!(published["status"], "failed");
    let row = platform_row(&published, "farcaster");
    assert_eq!(row["status"], "failed");
    assert!(row["error_message"].as_str().unwrap().contains("signer"));
}

#[tokio::test]
async fn test_partial_publish_retries_only_failed_platforms() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/farcaster/cast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "cast": { "hash": "0xbeef", "author": { "username": "alice" } }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": "1790", "text": "x" } })),
        )
        .mount(&server)
        .await;

    let resources = create_test_resources(&server.uri()).await;
    let (user, token) = signed_in_user(&resources, FID).await;
    seed_approved_signer(&resources, user.id).await;
    link_oauth_account(&resources, user.id, SocialPlatform::X, "42", "x-access").await;

    let post = create_post(&resources, &token, json!(["farcaster", "x"])).await;
    let id = post["id"].as_str().unwrap();
    assert!(platform_row(&post, "x")["connected_account_id"].is_string());

    let first: Value = AxumTestRequest::post(&format!("/api/posts/{id}/publish"))
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(first["status"], "partially_published");
    assert_eq!(platform_row(&first, "farcaster")["status"], "published");
    let x_row = platform_row(&first, "x");
    assert_eq!(x_row["status"], "failed");
    assert!(x_row["error_message"].as_str().unwrap().contains("500"));

    let second: Value = AxumTestRequest::post(&format!("/api/posts/{id}/publish"))
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(second["status"], "published");
    let x_row = platform_row(&second, "x");
    assert_eq!(x_row["status"], "published");
    assert_eq!(x_row["external_url"], "https://x.com/i/web/status/1790");
    assert!(x_row["error_message"].is_null());
    assert_eq!(platform_row(&second, "farcaster")["external_post_id"], "0xbeef");
}

#[tokio::test]
async fn test_publish_refreshes_grant_about_to_expire() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/x/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=x-refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "x-access-2",
            "token_type": "bearer",
            "expires_in": 7200,
            "refresh_token": "x-refresh-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .and(header("authorization", "Bearer x-access-2"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "data": { "id": "1791", "text": "x" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resources = create_test_resources(&server.uri()).await;
    let (user, token) = signed_in_user(&resources, FID).await;
    let account = link_oauth_account(&resources, user.id, SocialPlatform::X, "42", "x-access-1").await;
    // Inside the five minute refresh margin
    store_grant(&resources, &account, "x-access-1", Some("x-refresh-1"), Duration::minutes(2)).await;

    let post = create_post(&resources, &token, json!(["x"])).await;
    let published: Value =
        AxumTestRequest::post(&format!("/api/posts/{}/publish", post["id"].as_str().unwrap()))
            .bearer(&token)
            .send(app(&resources))
            .await
            .assert_status(StatusCode::OK)
            .json();
    assert_eq!(published["status"], "published");
    assert_eq!(platform_row(&published, "x")["external_post_id"], "1791");

    // The rotated grant is stored encrypted
    let stored = resources
        .database
        .get_oauth_token(account.id)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(stored.access_token, "x-access-2");
    assert_eq!(resources.cipher.decrypt(&stored.access_token).unwrap(), "x-access-2");
    let refresh = stored.refresh_token.as_deref().unwrap();
    assert_eq!(resources.cipher.decrypt(refresh).unwrap(), "x-refresh-2");
    assert!(stored.expires_at.unwrap() > Utc::now() + Duration::hours(1));
}

#[tokio::test]
async fn test_expired_grant_without_refresh_token_fails_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/tweets"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let resources = create_test_resources(&server.uri()).await;
    let (user, token) = signed_in_user(&resources, FID).await;
    let account = link_oauth_account(&resources, user.id, SocialPlatform::X, "42", "x-access").await;
    store_grant(&resources, &account, "x-access", None, Duration::minutes(-1)).await;

    let err = access_token_for(&resources, &account, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ExternalAuthFailed);
    assert!(err.message.starts_with("x: "));

    let post = create_post(&resources, &token, json!(["x"])).await;
    let published: Value =
        AxumTestRequest::post(&format!("/api/posts/{}/publish", post["id"].as_str().unwrap()))
            .bearer(&token)
            .send(app(&resources))
            .await
            .assert_status(StatusCode::OK)
            .json();
    assert_eq!(published["status"], "failed");
    let row = platform_row(&published, "x");
    assert_eq!(row["status"], "failed");
    assert!(row["error_message"].as_str().unwrap().contains("reconnect"));
}

#[tokio::test]
async fn test_posts_are_private_to_their_owner() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    let (_owner, owner_token) = signed_in_user(&resources, FID).await;
    let (_other, other_token) = signed_in_user(&resources, FID + 1).await;

    let post = create_post(&resources, &owner_token, json!(["farcaster"])).await;
    let uri = format!("/api/posts/{}", post["id"].as_str().unwrap());

    AxumTestRequest::get(&uri)
        .bearer(&other_token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    AxumTestRequest::delete(&uri)
        .bearer(&other_token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let page: Value = AxumTestRequest::get("/api/posts")
        .bearer(&other_token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(page["count"], 0);
}

#[tokio::test]
async fn test_update_draft_and_delete_keeps_history() {
    let server = MockServer::start().await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, FID).await;

    let post = create_post(&resources, &token, json!(["farcaster"])).await;
    let uri = format!("/api/posts/{}", post["id"].as_str().unwrap());

    let updated: Value = AxumTestRequest::patch(&uri)
        .bearer(&token)
        .json(&json!({ "content": "Evening swim", "media_urls": ["https://cdn.example.com/swim.jpg"] }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(updated["content"], "Evening swim");
    assert_eq!(updated["media_urls"][0], "https://cdn.example.com/swim.jpg");
    assert_eq!(updated["status"], "draft");

    let drafts: Value = AxumTestRequest::get("/api/posts?status=draft")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(drafts["count"], 1);

    AxumTestRequest::delete(&uri)
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let page: Value = AxumTestRequest::get("/api/posts")
        .bearer(&token)
        .send(app(&resources))
        .await
        .json();
    assert_eq!(page["count"], 0);
    assert_eq!(page["has_more"], false);

    let history: Value = AxumTestRequest::get("/api/posts/history")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(history["count"], 1);
    assert!(history["items"][0]["deleted_at"].is_string());

    AxumTestRequest::get(&uri)
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
