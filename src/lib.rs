// ABOUTME: Main library entry point for the Nora Health API server
// ABOUTME: Social posting, Farcaster sign-in, and health coaching records behind a REST API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![deny(unsafe_code)]

//! # Nora Health Server
//!
//! Backend for the Nora Health platform. Users sign in with Farcaster (verified
//! through Neynar), link social accounts over OAuth 2.0, publish posts to the
//! linked platforms, and keep health records: a health profile, meals and daily
//! meal plans, workouts, workout sessions and daily workout plans, and coaching
//! conversations.
//!
//! ## Architecture
//!
//! - **Routes**: thin axum handlers that authenticate and delegate
//! - **Services**: short use-cases (fetch, validate, mutate, respond)
//! - **Repositories**: `#[async_trait]` traits backed by `SQLite` through sqlx
//! - **External**: Neynar and OAuth 2.0 provider clients over reqwest
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use nora_health_server::config::environment::ServerConfig;
//! use nora_health_server::errors::AppResult;
//!
//! fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Nora Health API configured on port {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Unified error handling (re-exported from `nora-core`)
pub mod errors;

/// Cursor-based pagination (re-exported from `nora-core`)
pub mod pagination;

/// Environment-based configuration
pub mod config;

/// Structured logging setup
pub mod logging;

/// Token encryption and hashing helpers
pub mod crypto;

/// JWT session tokens
pub mod auth;

/// Domain models
pub mod models;

/// `SQLite` storage and repositories
pub mod database;

/// Third-party API clients (Neynar)
pub mod external;

/// OAuth 2.0 client for social platform account linking
pub mod oauth2_client;

/// Use-case layer
pub mod services;

/// HTTP middleware (authentication, CORS)
pub mod middleware;

/// HTTP route handlers
pub mod routes;

/// Shared server resources for dependency injection
pub mod resources;

/// HTTP server assembly and lifecycle
pub mod server;
