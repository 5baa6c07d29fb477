// ABOUTME: JWT-based session authentication for signed-in users
// ABOUTME: Issues HS256 access tokens and validates them with detailed error reporting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Session Tokens
//!
//! Access tokens are short-lived HS256 JWTs. Long-lived refresh tokens are
//! opaque random strings handled by the sign-in service; only their hashes are
//! stored.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use nora_core::constants::service_names::JWT_AUDIENCE;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, AppResult, ErrorCode};

/// `JWT` validation error with detailed information
#[derive(Debug, Clone)]
pub enum JwtValidationError {
    /// Token has expired
    TokenExpired {
        /// When the token expired
        expired_at: DateTime<Utc>,
    },
    /// Token signature or claims are invalid
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is malformed (not proper `JWT` format)
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl std::fmt::Display for JwtValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TokenExpired { expired_at } => write!(
                f,
                "JWT token expired at {}",
                expired_at.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            Self::TokenInvalid { reason } => write!(f, "JWT token is invalid: {reason}"),
            Self::TokenMalformed { details } => write!(f, "JWT token is malformed: {details}"),
        }
    }
}

impl std::error::Error for JwtValidationError {}

impl From<JwtValidationError> for AppError {
    fn from(err: JwtValidationError) -> Self {
        let code = match err {
            JwtValidationError::TokenExpired { .. } => ErrorCode::AuthExpired,
            JwtValidationError::TokenInvalid { .. } | JwtValidationError::TokenMalformed { .. } => {
                ErrorCode::AuthInvalid
            }
        };
        Self::new(code, err.to_string())
    }
}

/// `JWT` claims for a user session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User `ID`
    pub sub: String,
    /// Farcaster id of the signed-in user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fid: Option<i64>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Unique token id
    pub jti: String,
    /// Audience (who the token is intended for)
    pub aud: String,
}

/// An issued access token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT
    pub token: String,
    /// Expiry of the JWT
    pub expires_at: DateTime<Utc>,
}

/// Authentication manager for session `JWT`s
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_hours: i64,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("token_expiry_hours", &self.token_expiry_hours)
            .finish_non_exhaustive()
    }
}

impl AuthManager {
    /// Create a new authentication manager
    #[must_use]
    pub fn new(secret: &[u8], token_expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            token_expiry_hours,
        }
    }

    /// Lifetime of issued tokens in hours
    #[must_use]
    pub const fn token_expiry_hours(&self) -> i64 {
        self.token_expiry_hours
    }

    /// Generate an access token for a user
    ///
    /// # Errors
    ///
    /// Returns an internal error if JWT encoding fails
    pub fn generate_token(&self, user_id: Uuid, fid: Option<i64>) -> AppResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.token_expiry_hours);
        let claims = Claims {
            sub: user_id.to_string(),
            fid,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            aud: JWT_AUDIENCE.to_owned(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode JWT: {e}")))?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Validate an access token and return its claims
    ///
    /// # Errors
    ///
    /// Returns a [`JwtValidationError`] describing whether the token is
    /// expired, has a bad signature or audience, or is not a JWT at all
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        // Expiry is checked separately so an expired token is reported as such
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.set_audience(&[JWT_AUDIENCE]);

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Self::convert_jwt_error(&e))?;

        let now = Utc::now();
        if now.timestamp() >= claims.exp {
            let expired_at = DateTime::from_timestamp(claims.exp, 0).unwrap_or(now);
            tracing::debug!(user.id = %claims.sub, "Rejected expired access token");
            return Err(JwtValidationError::TokenExpired { expired_at });
        }
        Ok(claims)
    }

    /// Validate a token and parse the user id from its subject
    ///
    /// # Errors
    ///
    /// Returns an authentication error if the token is invalid or its subject
    /// is not a user id
    pub fn authenticate(&self, token: &str) -> AppResult<(Uuid, Claims)> {
        let claims = self.validate_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::auth_invalid("Token subject is not a user id"))?;
        Ok((user_id, claims))
    }

    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        use jsonwebtoken::errors::ErrorKind;

        match e.kind() {
            ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
                reason: "Token signature verification failed".into(),
            },
            ErrorKind::InvalidAudience => JwtValidationError::TokenInvalid {
                reason: "Token was issued for another audience".into(),
            },
            ErrorKind::InvalidAlgorithm => JwtValidationError::TokenInvalid {
                reason: "Token uses an unsupported algorithm".into(),
            },
            ErrorKind::InvalidToken => JwtValidationError::TokenMalformed {
                details: "Token format is invalid".into(),
            },
            ErrorKind::Base64(base64_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid base64: {base64_err}"),
            },
            ErrorKind::Json(json_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid JSON: {json_err}"),
            },
            ErrorKind::Utf8(utf8_err) => JwtValidationError::TokenMalformed {
                details: format!("Token contains invalid UTF-8: {utf8_err}"),
            },
            _ => JwtValidationError::TokenInvalid {
                reason: format!("Token validation failed: {e}"),
            },
        }
    }
}
