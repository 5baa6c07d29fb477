// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: In-memory database, resources wired to a mock Neynar/OAuth server, and seeded users
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]
//! Shared test utilities for `nora_health_server`

use std::sync::{Arc, Once};

use axum::Router;
use chrono::{Duration, Utc};
use nora_health_server::{
    config::environment::{NeynarConfig, OAuthProviderConfig, ServerConfig},
    database::{AccountRepository, Database, UserRepository},
    models::{AuthProfile, AuthProvider, ConnectedAccount, SocialPlatform, StoredOAuthToken, User},
    resources::ServerResources,
    server::NoraHealthServer,
};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Database {
    init_test_logging();
    Database::new("sqlite::memory:")
        .await
        .expect("Failed to create test database")
}

/// Configuration pointing Neynar and both OAuth platforms at `mock_uri`
pub fn test_config(mock_uri: &str) -> ServerConfig {
    let provider = |platform: SocialPlatform| OAuthProviderConfig {
        client_id: Some(format!("{platform}-client")),
        client_secret: Some(format!("{platform}-secret")),
        redirect_uri: Some(format!(
            "http://localhost:8081/api/accounts/{platform}/callback"
        )),
        auth_url: format!("{mock_uri}/oauth/{platform}/authorize"),
        token_url: format!("{mock_uri}/oauth/{platform}/token"),
        api_base_url: mock_uri.to_owned(),
        ..OAuthProviderConfig::defaults_for(platform)
    };

    let mut config = ServerConfig::default();
    config.neynar = NeynarConfig {
        api_key: Some("test-neynar-key".to_owned()),
        base_url: mock_uri.to_owned(),
        sign_in_domain: "app.nora.test".to_owned(),
    };
    config.oauth.x = provider(SocialPlatform::X);
    config.oauth.linkedin = provider(SocialPlatform::LinkedIn);
    config
}

/// Resources over an in-memory database with external calls going to `mock_uri`
pub async fn create_test_resources(mock_uri: &str) -> Arc<ServerResources> {
    create_test_resources_with_config(test_config(mock_uri)).await
}

/// Resources over an in-memory database with a custom configuration
pub async fn create_test_resources_with_config(config: ServerConfig) -> Arc<ServerResources> {
    let database = create_test_database().await;
    Arc::new(ServerResources::new(database, config))
}

/// The full application router, middleware included
pub fn app(resources: &Arc<ServerResources>) -> Router {
    NoraHealthServer::new(resources.clone()).router()
}

/// Create a user with a Farcaster identity for `fid`
pub async fn create_test_user(database: &Database, fid: i64) -> User {
    let now = Utc::now();
    let snapshot = AuthProfile {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        provider: AuthProvider::Farcaster,
        provider_user_id: fid.to_string(),
        username: Some(format!("user{fid}")),
        display_name: Some(format!("User {fid}")),
        avatar_url: None,
        custody_address: None,
        created_at: now,
        updated_at: now,
    };
    let (user, _) = database
        .find_or_create_by_auth_profile(&snapshot, now)
        .await
        .expect("Failed to create test user");
    user
}

/// Access token for a user
pub fn session_token(resources: &ServerResources, user: &User, fid: i64) -> String {
    resources
        .auth_manager
        .generate_token(user.id, Some(fid))
        .expect("Failed to generate token")
        .token
}

/// Create a user and return it with a valid access token
pub async fn signed_in_user(resources: &ServerResources, fid: i64) -> (User, String) {
    let user = create_test_user(&resources.database, fid).await;
    let token = session_token(resources, &user, fid);
    (user, token)
}

/// Link an OAuth account with a stored, non-expiring grant
pub async fn link_oauth_account(
    resources: &ServerResources,
    user_id: Uuid,
    platform: SocialPlatform,
    platform_user_id: &str,
    access_token: &str,
) -> ConnectedAccount {
    let now = Utc::now();
    let account = resources
        .database
        .upsert_account(&ConnectedAccount {
            id: Uuid::new_v4(),
            user_id,
            platform,
            platform_user_id: platform_user_id.to_owned(),
            username: Some(format!("{platform}_user")),
            display_name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await
        .expect("Failed to link account");
    resources
        .database
        .upsert_oauth_token(&StoredOAuthToken {
            connected_account_id: account.id,
            access_token: resources.cipher.encrypt(access_token).unwrap(),
            refresh_token: None,
            token_type: "Bearer".to_owned(),
            scope: None,
            expires_at: Some(now + Duration::hours(2)),
            updated_at: now,
        })
        .await
        .expect("Failed to store grant");
    account
}

/// Neynar answers a signer lookup
pub async fn mount_neynar_signer(
    server: &MockServer,
    signer_uuid: &str,
    status: &str,
    fid: Option<i64>,
) {
    Mock::given(method("GET"))
        .and(path("/v2/farcaster/signer"))
        .and(query_param("signer_uuid", signer_uuid))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "signer_uuid": signer_uuid,
            "public_key": "0xabcdef",
            "status": status,
            "fid": fid,
        })))
        .mount(server)
        .await;
}

/// Neynar answers a bulk user lookup for `fid`
pub async fn mount_neynar_user(server: &MockServer, fid: i64, username: &str) {
    Mock::given(method("GET"))
        .and(path("/v2/farcaster/user/bulk"))
        .and(query_param("fids", fid.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [{
                "fid": fid,
                "username": username,
                "display_name": format!("{username} display"),
                "pfp_url": "https://img.example.com/pfp.png",
                "custody_address": "0x1234",
                "profile": { "bio": { "text": "Runner" } }
            }]
        })))
        .mount(server)
        .await;
}

/// Neynar accepts casts and returns `hash`
pub async fn mount_neynar_cast(server: &MockServer, hash: &str, username: &str) {
    Mock::given(method("POST"))
        .and(path("/v2/farcaster/cast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "cast": { "hash": hash, "author": { "username": username } }
        })))
        .mount(server)
        .await;
}
