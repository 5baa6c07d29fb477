// ABOUTME: Session authentication for HTTP requests
// ABOUTME: Accepts a Bearer JWT or the auth_token cookie and rejects deleted users
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use std::sync::Arc;

use axum::http::HeaderMap;
use uuid::Uuid;

use crate::auth::AuthManager;
use crate::database::{Database, UserRepository};
use crate::errors::{AppError, AppResult};

/// Name of the cookie web clients carry the session JWT in
pub const AUTH_COOKIE: &str = "auth_token";

/// Authenticated caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthResult {
    /// Signed-in user
    pub user_id: Uuid,
    /// Farcaster id the session was issued for
    pub fid: Option<i64>,
}

/// Read a cookie value from the `Cookie` headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Middleware for session authentication
#[derive(Clone)]
pub struct AuthMiddleware {
    auth_manager: Arc<AuthManager>,
    database: Database,
}

impl AuthMiddleware {
    /// Create new auth middleware
    #[must_use]
    pub const fn new(auth_manager: Arc<AuthManager>, database: Database) -> Self {
        Self {
            auth_manager,
            database,
        }
    }

    /// Authenticate a request from its `Authorization` header or session cookie
    ///
    /// # Errors
    ///
    /// Returns an authentication error if no credentials are present, the token
    /// is invalid or expired, or the user no longer exists
    #[tracing::instrument(
        skip(self, headers),
        fields(
            auth_method = tracing::field::Empty,
            user_id = tracing::field::Empty,
            success = tracing::field::Empty,
        )
    )]
    pub async fn authenticate_request_with_headers(
        &self,
        headers: &HeaderMap,
    ) -> AppResult<AuthResult> {
        let span = tracing::Span::current();

        let token = if let Some(header) = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        {
            span.record("auth_method", "BEARER");
            header
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    span.record("success", false);
                    AppError::auth_invalid(
                        "Invalid authorization header format - must be 'Bearer <token>'",
                    )
                })?
                .to_owned()
        } else if let Some(cookie) = get_cookie_value(headers, AUTH_COOKIE) {
            span.record("auth_method", "COOKIE");
            cookie
        } else {
            tracing::debug!("Request has no credentials");
            return Err(AppError::auth_required());
        };

        let (user_id, claims) = self.auth_manager.authenticate(&token).inspect_err(|e| {
            span.record("success", false);
            tracing::warn!("JWT authentication failed: {e}");
        })?;

        if self.database.get_user(user_id).await?.is_none() {
            span.record("success", false);
            tracing::warn!(user.id = %user_id, "Token belongs to a deleted or unknown user");
            return Err(AppError::auth_invalid("User no longer exists"));
        }

        span.record("user_id", user_id.to_string())
            .record("success", true);
        Ok(AuthResult {
            user_id,
            fid: claims.fid,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_get_cookie_value() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; auth_token=abc.def.ghi; other=1"),
        );
        assert_eq!(
            get_cookie_value(&headers, AUTH_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert!(get_cookie_value(&headers, "missing").is_none());
        assert!(get_cookie_value(&HeaderMap::new(), AUTH_COOKIE).is_none());
    }
}
