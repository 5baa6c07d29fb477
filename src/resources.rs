// ABOUTME: Shared server resources handed to every route handler
// ABOUTME: Built once at startup; everything inside is immutable or internally synchronized
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::environment::ServerConfig;
use crate::crypto::TokenCipher;
use crate::database::Database;
use crate::external::http_client::api_client;
use crate::external::NeynarClient;
use crate::middleware::AuthMiddleware;

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// `SQLite` pool and repositories
    pub database: Database,
    /// Immutable configuration
    pub config: Arc<ServerConfig>,
    /// Session token issuer and validator
    pub auth_manager: Arc<AuthManager>,
    /// Request authentication
    pub auth_middleware: AuthMiddleware,
    /// Cipher for OAuth tokens at rest
    pub cipher: Arc<TokenCipher>,
    /// Neynar client
    pub neynar: NeynarClient,
    /// Client for OAuth and platform API calls
    pub http_client: reqwest::Client,
}

impl ServerResources {
    /// Create resources from an opened database and loaded configuration
    #[must_use]
    pub fn new(database: Database, config: ServerConfig) -> Self {
        let http_client = api_client();
        let auth_manager = AuthManager::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.jwt_expiry_hours,
        );
        let cipher = TokenCipher::new(&config.auth.encryption_key);
        let neynar = NeynarClient::new(config.neynar.clone(), http_client.clone());
        let auth_manager = Arc::new(auth_manager);
        let auth_middleware = AuthMiddleware::new(auth_manager.clone(), database.clone());

        Self {
            database,
            config: Arc::new(config),
            auth_manager,
            auth_middleware,
            cipher: Arc::new(cipher),
            neynar,
            http_client,
        }
    }
}
