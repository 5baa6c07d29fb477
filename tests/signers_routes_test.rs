// ABOUTME: Integration tests for Neynar signer creation, registration, refresh and revocation
// ABOUTME: Neynar is replaced by a wiremock server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{app, create_test_resources, mount_neynar_signer, signed_in_user};
use helpers::axum_test::AxumTestRequest;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FID: i64 = 3030;

#[tokio::test]
async fn test_create_then_refresh_signer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/farcaster/signer"))
        .and(header("x-api-key", "test-neynar-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signer_uuid": "fresh-signer",
            "public_key": "0xfeed",
            "status": "pending_approval",
            "signer_approval_url": "https://client.warpcast.com/deeplinks/signed-key-request?token=abc"
        })))
        .mount(&server)
        .await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, FID).await;

    let created: Value = AxumTestRequest::post("/api/signers")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::CREATED)
        .json();
    assert_eq!(created["signer_uuid"], "fresh-signer");
    assert_eq!(created["status"], "pending_approval");
    assert!(created["approval_url"]
        .as_str()
        .unwrap()
        .contains("signed-key-request"));

    // The user approves in their Farcaster client
    mount_neynar_signer(&server, "fresh-signer", "approved", Some(FID)).await;
    let refreshed: Value = AxumTestRequest::get("/api/signers/fresh-signer")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(refreshed["status"], "approved");
    assert_eq!(refreshed["fid"], FID);
    assert!(refreshed["approval_url"].is_string());
}

#[tokio::test]
async fn test_register_signer_checks_fid_and_owner() {
    let server = MockServer::start().await;
    mount_neynar_signer(&server, "mine", "approved", Some(FID)).await;
    mount_neynar_signer(&server, "theirs", "approved", Some(FID + 1)).await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, FID).await;
    let (_other, other_token) = signed_in_user(&resources, FID + 1).await;

    let registered: Value = AxumTestRequest::post("/api/signers/register")
        .bearer(&token)
        .json(&json!({ "signer_uuid": "mine" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(registered["status"], "approved");

    AxumTestRequest::post("/api/signers/register")
        .bearer(&token)
        .json(&json!({ "signer_uuid": "theirs" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    AxumTestRequest::post("/api/signers/register")
        .bearer(&other_token)
        .json(&json!({ "signer_uuid": "mine" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::CONFLICT);

    // Unknown to Neynar
    AxumTestRequest::post("/api/signers/register")
        .bearer(&token)
        .json(&json!({ "signer_uuid": "ghost" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let signers: Value = AxumTestRequest::get("/api/signers")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(signers["signers"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_revoke_signer() {
    let server = MockServer::start().await;
    mount_neynar_signer(&server, "mine", "approved", Some(FID)).await;
    let resources = create_test_resources(&server.uri()).await;
    let (_user, token) = signed_in_user(&resources, FID).await;

    AxumTestRequest::post("/api/signers/register")
        .bearer(&token)
        .json(&json!({ "signer_uuid": "mine" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK);

    AxumTestRequest::delete("/api/signers/mine")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    AxumTestRequest::get("/api/signers/mine")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    AxumTestRequest::delete("/api/signers/mine")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
