// ABOUTME: Integration tests for Farcaster sign-in, session refresh, logout and the current user
// ABOUTME: Neynar is replaced by a wiremock server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use common::{app, create_test_resources, mount_neynar_signer, mount_neynar_user, signed_in_user};
use helpers::axum_test::{AxumTestRequest, AxumTestResponse};
use nora_health_server::database::{AuthTokenRepository, SignerRepository, UserRepository};
use nora_health_server::models::{
    AuthProfile, AuthProvider, AuthToken, AuthTokenType, NeynarSigner, SignerStatus,
};
use nora_health_server::resources::ServerResources;
use serde_json::{json, Value};
use uuid::Uuid;
use wiremock::MockServer;

const FID: i64 = 4242;
const SIGNER: &str = "5f0e3c4a-0000-4000-8000-000000000001";

async fn setup() -> (MockServer, Arc<ServerResources>) {
    let server = MockServer::start().await;
    mount_neynar_signer(&server, SIGNER, "approved", Some(FID)).await;
    mount_neynar_user(&server, FID, "alice").await;
    let resources = create_test_resources(&server.uri()).await;
    (server, resources)
}

async fn issue_nonce(resources: &Arc<ServerResources>) -> String {
    let body: Value = AxumTestRequest::post("/api/auth/nonce")
        .send(app(resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    body["nonce"].as_str().unwrap().to_owned()
}

fn farcaster_snapshot(fid: i64) -> AuthProfile {
    let now = Utc::now();
    AuthProfile {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        provider: AuthProvider::Farcaster,
        provider_user_id: fid.to_string(),
        username: None,
        display_name: None,
        avatar_url: None,
        custody_address: None,
        created_at: now,
        updated_at: now,
    }
}

async fn sign_in(resources: &Arc<ServerResources>, nonce: &str, fid: i64) -> AxumTestResponse {
    AxumTestRequest::post("/api/auth/farcaster")
        .json(&json!({ "nonce": nonce, "fid": fid, "signer_uuid": SIGNER }))
        .send(app(resources))
        .await
}

/// Sign-In-With-Farcaster message for `domain`, `nonce` and `fid`, valid for ten minutes
fn siwf_message(domain: &str, nonce: &str, fid: i64) -> String {
    let now = Utc::now();
    let ts = |at: DateTime<Utc>| at.to_rfc3339_opts(SecondsFormat::Millis, true);
    format!(
        "{domain} wants you to sign in with your Ethereum account:\n\
         0x8ba1f109551bD432803012645Ac136ddd64DBA72\n\
         \n\
         Farcaster Auth\n\
         \n\
         URI: https://{domain}/login\n\
         Version: 1\n\
         Chain ID: 10\n\
         Nonce: {nonce}\n\
         Issued At: {}\n\
         Expiration Time: {}\n\
         Resources:\n\
         - farcaster://fid/{fid}",
        ts(now),
        ts(now + Duration::minutes(10)),
    )
}

async fn sign_in_with_message(
    resources: &Arc<ServerResources>,
    nonce: &str,
    message: &str,
) -> AxumTestResponse {
    AxumTestRequest::post("/api/auth/farcaster")
        .json(&json!({
            "nonce": nonce,
            "fid": FID,
            "signer_uuid": SIGNER,
            "message": message,
            "signature": "0x5f1c",
        }))
        .send(app(resources))
        .await
}

#[tokio::test]
async fn test_sign_in_with_valid_siwf_message() {
    let (_server, resources) = setup().await;
    let nonce = issue_nonce(&resources).await;

    let message = siwf_message("app.nora.test", &nonce, FID);
    let body: Value = sign_in_with_message(&resources, &nonce, &message)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["is_new_user"], true);
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn test_sign_in_rejects_siwf_message_for_other_domain() {
    let (_server, resources) = setup().await;
    let nonce = issue_nonce(&resources).await;

    let message = siwf_message("evil.example", &nonce, FID);
    let body: Value = sign_in_with_message(&resources, &nonce, &message)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .json();
    assert_eq!(body["error"]["code"], "AUTH_INVALID");
    assert!(body["error"]["message"].as_str().unwrap().contains("evil.example"));
}

#[tokio::test]
async fn test_sign_in_rejects_siwf_message_with_other_nonce_or_fid() {
    let (_server, resources) = setup().await;

    let nonce = issue_nonce(&resources).await;
    let message = siwf_message("app.nora.test", "someothernonce", FID);
    sign_in_with_message(&resources, &nonce, &message)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let nonce = issue_nonce(&resources).await;
    let message = siwf_message("app.nora.test", &nonce, FID + 1);
    sign_in_with_message(&resources, &nonce, &message)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_creates_user_once_per_fid() {
    let (_server, resources) = setup().await;

    let nonce = issue_nonce(&resources).await;
    let response = sign_in(&resources, &nonce, FID).await.assert_status(StatusCode::OK);
    let cookie = response.header("set-cookie").unwrap();
    assert!(cookie.contains("HttpOnly"));
    let session = response.session_cookie().unwrap();
    let first: Value = response.json();
    assert_eq!(first["access_token"], session);
    assert_eq!(first["is_new_user"], true);
    assert_eq!(first["token_type"], "Bearer");
    assert_eq!(first["user"]["username"], "alice");
    assert_eq!(first["user"]["bio"], "Runner");

    let nonce = issue_nonce(&resources).await;
    let second: Value = sign_in(&resources, &nonce, FID)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(second["is_new_user"], false);
    assert_eq!(second["user"]["id"], first["user"]["id"]);

    // Sign-in links the Farcaster account and stores the signer
    let token = second["access_token"].as_str().unwrap();
    let accounts: Value = AxumTestRequest::get("/api/accounts")
        .bearer(token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(accounts["accounts"].as_array().unwrap().len(), 1);
    assert_eq!(accounts["accounts"][0]["platform"], "farcaster");
    assert_eq!(accounts["accounts"][0]["platform_user_id"], FID.to_string());

    let signers: Value = AxumTestRequest::get("/api/signers")
        .bearer(token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(signers["signers"][0]["signer_uuid"], SIGNER);
    assert_eq!(signers["signers"][0]["status"], "approved");
}

#[tokio::test]
async fn test_sign_in_after_account_deletion_starts_fresh() {
    let (_server, resources) = setup().await;

    let nonce = issue_nonce(&resources).await;
    let first: Value = sign_in(&resources, &nonce, FID)
        .await
        .assert_status(StatusCode::OK)
        .json();
    AxumTestRequest::delete("/api/users/me")
        .bearer(first["access_token"].as_str().unwrap())
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    // Same fid and signer come back as a brand new user
    let nonce = issue_nonce(&resources).await;
    let second: Value = sign_in(&resources, &nonce, FID)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(second["is_new_user"], true);
    assert_ne!(second["user"]["id"], first["user"]["id"]);
    assert_eq!(second["user"]["bio"], "Runner");

    let token = second["access_token"].as_str().unwrap();
    let signers: Value = AxumTestRequest::get("/api/signers")
        .bearer(token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(signers["signers"].as_array().unwrap().len(), 1);
    assert_eq!(signers["signers"][0]["signer_uuid"], SIGNER);

    let accounts: Value = AxumTestRequest::get("/api/accounts")
        .bearer(token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(accounts["accounts"].as_array().unwrap().len(), 1);

    // The next sign-in resolves to that same user
    let nonce = issue_nonce(&resources).await;
    let third: Value = sign_in(&resources, &nonce, FID)
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(third["is_new_user"], false);
    assert_eq!(third["user"]["id"], second["user"]["id"]);
}

#[tokio::test]
async fn test_sign_in_with_signer_of_another_user_writes_nothing() {
    let (_server, resources) = setup().await;

    // The signer is already held by a different live user
    let (owner, _) = signed_in_user(&resources, FID + 7).await;
    let now = Utc::now();
    resources
        .database
        .upsert_signer(&NeynarSigner {
            id: Uuid::new_v4(),
            user_id: owner.id,
            signer_uuid: SIGNER.to_owned(),
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
        .unwrap();

    let nonce = issue_nonce(&resources).await;
    let code = sign_in(&resources, &nonce, FID)
        .await
        .assert_status(StatusCode::CONFLICT)
        .error_code();
    assert_eq!(code, "RESOURCE_CONFLICT");

    // No user was left behind for the fid
    let (_, created) = resources
        .database
        .find_or_create_by_auth_profile(&farcaster_snapshot(FID), now)
        .await
        .unwrap();
    assert!(created);
}

#[tokio::test]
async fn test_nonce_is_single_use() {
    let (_server, resources) = setup().await;
    let nonce = issue_nonce(&resources).await;

    sign_in(&resources, &nonce, FID).await.assert_status(StatusCode::OK);
    let code = sign_in(&resources, &nonce, FID)
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .error_code();
    assert_eq!(code, "AUTH_INVALID");
}

#[tokio::test]
async fn test_issuing_nonce_purges_expired_tokens() {
    let (_server, resources) = setup().await;
    let now = Utc::now();
    for token_type in [AuthTokenType::Nonce, AuthTokenType::OAuthState] {
        resources
            .database
            .store_token(&AuthToken {
                id: Uuid::new_v4(),
                user_id: None,
                token_type,
                token_hash: format!("stale-{token_type}"),
                payload: None,
                expires_at: now - Duration::minutes(1),
                consumed_at: None,
                created_at: now - Duration::minutes(20),
            })
            .await
            .unwrap();
    }

    issue_nonce(&resources).await;

    assert_eq!(
        resources.database.delete_expired_tokens(Utc::now()).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_unknown_nonce_rejected() {
    let (_server, resources) = setup().await;
    sign_in(&resources, "never-issued", FID)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signer_must_be_approved_for_fid() {
    let (server, resources) = setup().await;

    // Signer approved for a different fid
    let nonce = issue_nonce(&resources).await;
    sign_in(&resources, &nonce, FID + 1)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Signer still awaiting approval
    let pending = "5f0e3c4a-0000-4000-8000-000000000002";
    mount_neynar_signer(&server, pending, "pending_approval", None).await;
    let nonce = issue_nonce(&resources).await;
    AxumTestRequest::post("/api/auth/farcaster")
        .json(&json!({ "nonce": nonce, "fid": FID, "signer_uuid": pending }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_token_rotates_and_is_single_use() {
    let (_server, resources) = setup().await;
    let nonce = issue_nonce(&resources).await;
    let session: Value = sign_in(&resources, &nonce, FID).await.json();
    let refresh_token = session["refresh_token"].as_str().unwrap();

    let refreshed: Value = AxumTestRequest::post("/api/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_ne!(refreshed["refresh_token"], session["refresh_token"]);

    AxumTestRequest::get("/api/users/me")
        .bearer(refreshed["access_token"].as_str().unwrap())
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK);

    AxumTestRequest::post("/api/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_consumes_refresh_token() {
    let (_server, resources) = setup().await;
    let nonce = issue_nonce(&resources).await;
    let session: Value = sign_in(&resources, &nonce, FID).await.json();
    let refresh_token = session["refresh_token"].as_str().unwrap();

    let response = AxumTestRequest::post("/api/auth/logout")
        .json(&json!({ "refresh_token": refresh_token }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(response.header("set-cookie").unwrap().contains("Max-Age=0"));

    AxumTestRequest::post("/api/auth/refresh")
        .json(&json!({ "refresh_token": refresh_token }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_requires_credentials() {
    let (_server, resources) = setup().await;

    let body: Value = AxumTestRequest::get("/api/users/me")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED)
        .json();
    assert_eq!(body["error"]["code"], "AUTH_REQUIRED");

    AxumTestRequest::get("/api/users/me")
        .bearer("not-a-jwt")
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_accepts_session_cookie() {
    let (_server, resources) = setup().await;
    let (user, token) = signed_in_user(&resources, FID).await;

    let body: Value = AxumTestRequest::get("/api/users/me")
        .session_cookie(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["user"]["id"], user.id.to_string());
    assert_eq!(body["farcaster"]["provider_user_id"], FID.to_string());
}

#[tokio::test]
async fn test_update_and_delete_me() {
    let (_server, resources) = setup().await;
    let (_user, token) = signed_in_user(&resources, FID).await;

    let body: Value = AxumTestRequest::patch("/api/users/me")
        .bearer(&token)
        .json(&json!({ "display_name": "Alice A.", "email": "Alice@Example.com" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(body["display_name"], "Alice A.");
    assert_eq!(body["email"], "alice@example.com");

    AxumTestRequest::patch("/api/users/me")
        .bearer(&token)
        .json(&json!({ "username": "has spaces" }))
        .send(app(&resources))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    AxumTestRequest::delete("/api/users/me")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    AxumTestRequest::get("/api/users/me")
        .bearer(&token)
        .send(app(&resources))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}
