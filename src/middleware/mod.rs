// ABOUTME: HTTP middleware for authentication, CORS and request tracing
// ABOUTME: Provides request ID generation, request spans and bearer/cookie authentication
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

/// Session authentication for route handlers
pub mod auth;
/// CORS layer built from configuration
pub mod cors;
/// Request ids and request spans
pub mod tracing;

pub use auth::{AuthMiddleware, AuthResult};
pub use cors::setup_cors;
pub use tracing::{create_request_span, NoraRequestId, REQUEST_ID_HEADER};
