// ABOUTME: Tests for loading server configuration from process environment variables
// ABOUTME: Runs serially because the process environment is shared between tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;

use nora_health_server::config::environment::{DatabaseUrl, Environment, ServerConfig};
use serial_test::serial;

const VARS: &[&str] = &[
    "ENVIRONMENT",
    "HTTP_PORT",
    "HOST",
    "DATABASE_URL",
    "NORA_JWT_SECRET",
    "NORA_ENCRYPTION_KEY",
    "NEYNAR_API_KEY",
    "FRONTEND_URL",
    "LINKEDIN_CLIENT_ID",
    "LINKEDIN_REDIRECT_URI",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_environment_parsing() {
    assert_eq!(
        Environment::from_str_or_default("PROD"),
        Environment::Production
    );
    assert_eq!(
        Environment::from_str_or_default("test"),
        Environment::Testing
    );
    assert_eq!(
        Environment::from_str_or_default("staging"),
        Environment::Development
    );
}

#[test]
#[serial]
fn test_from_env_reads_process_variables() {
    clear_env();
    env::set_var("HTTP_PORT", "9090");
    env::set_var("HOST", "127.0.0.1");
    env::set_var("DATABASE_URL", "sqlite::memory:");
    env::set_var("NORA_JWT_SECRET", "0123456789abcdef0123456789abcdef");
    env::set_var("NEYNAR_API_KEY", "neynar-key");
    env::set_var("FRONTEND_URL", "https://app.nora.health/");
    env::set_var("LINKEDIN_CLIENT_ID", "li-client");
    env::set_var("LINKEDIN_REDIRECT_URI", "https://api.nora.health/api/accounts/linkedin/callback");

    let config = ServerConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.http_port, 9090);
    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.database.url, DatabaseUrl::Memory);
    assert_eq!(config.auth.jwt_secret, "0123456789abcdef0123456789abcdef");
    assert_eq!(config.neynar.api_key.as_deref(), Some("neynar-key"));
    assert_eq!(config.frontend_url.as_deref(), Some("https://app.nora.health"));
    assert!(config.oauth.linkedin.is_enabled());
    assert!(!config.oauth.x.is_enabled());
}

#[test]
#[serial]
fn test_from_env_rejects_short_jwt_secret() {
    clear_env();
    env::set_var("NORA_JWT_SECRET", "too-short");
    let result = ServerConfig::from_env();
    clear_env();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_from_env_production_requires_secrets() {
    clear_env();
    env::set_var("ENVIRONMENT", "production");
    let result = ServerConfig::from_env();
    clear_env();
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_blank_values_fall_back_to_defaults() {
    clear_env();
    env::set_var("HTTP_PORT", "   ");
    let config = ServerConfig::from_env().unwrap();
    clear_env();
    assert_eq!(config.http_port, 8081);
    assert_eq!(config.environment, Environment::Development);
}
