// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, deployment modes, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! Environment-based configuration management for production deployment

use std::env;
use std::fmt;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use nora_core::constants::tokens::DEFAULT_JWT_EXPIRY_HOURS;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::crypto::{generate_encryption_key, generate_token};
use crate::errors::{AppError, AppResult};
use crate::models::SocialPlatform;

/// Environment type for security and other configurations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (generated secrets allowed)
    #[default]
    Development,
    /// Production deployment (secrets required)
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Type-safe database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path to the database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from string
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path = s
            .strip_prefix("sqlite://")
            .or_else(|| s.strip_prefix("sqlite:"))
            .unwrap_or(s);
        if path == ":memory:" {
            return Self::Memory;
        }
        Self::SQLite {
            path: PathBuf::from(path),
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".to_owned(),
        }
    }
}

impl Default for DatabaseUrl {
    fn default() -> Self {
        Self::SQLite {
            path: PathBuf::from("./data/nora.db"),
        }
    }
}

/// Database settings
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Database location
    pub url: DatabaseUrl,
}

/// Session and encryption secrets
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for session JWTs
    pub jwt_secret: String,
    /// Session JWT lifetime
    pub jwt_expiry_hours: i64,
    /// AES-256 key for OAuth tokens at rest
    pub encryption_key: [u8; 32],
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("encryption_key", &"[REDACTED]")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: generate_token(32),
            jwt_expiry_hours: DEFAULT_JWT_EXPIRY_HOURS,
            encryption_key: generate_encryption_key(),
        }
    }
}

/// Neynar (Farcaster) API settings
#[derive(Clone)]
pub struct NeynarConfig {
    /// API key sent as `x-api-key`
    pub api_key: Option<String>,
    /// Base URL of the Neynar REST API
    pub base_url: String,
    /// Domain that sign-in messages must be issued for
    pub sign_in_domain: String,
}

impl fmt::Debug for NeynarConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeynarConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("sign_in_domain", &self.sign_in_domain)
            .finish()
    }
}

impl Default for NeynarConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.neynar.com".to_owned(),
            sign_in_domain: "localhost".to_owned(),
        }
    }
}

/// OAuth 2.0 settings for one social platform
#[derive(Clone)]
pub struct OAuthProviderConfig {
    /// Client id registered with the platform; `None` disables the platform
    pub client_id: Option<String>,
    /// Client secret registered with the platform
    pub client_secret: Option<String>,
    /// Redirect URI registered with the platform
    pub redirect_uri: Option<String>,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Base URL of the platform REST API
    pub api_base_url: String,
    /// Scopes requested during authorization
    pub scopes: Vec<String>,
}

impl fmt::Debug for OAuthProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthProviderConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("redirect_uri", &self.redirect_uri)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl OAuthProviderConfig {
    /// Built-in endpoints for a platform, without credentials
    #[must_use]
    pub fn defaults_for(platform: SocialPlatform) -> Self {
        let (auth_url, token_url, api_base_url, scopes): (&str, &str, &str, &[&str]) =
            match platform {
                SocialPlatform::X => (
                    "https://twitter.com/i/oauth2/authorize",
                    "https://api.twitter.com/2/oauth2/token",
                    "https://api.twitter.com",
                    &["tweet.read", "tweet.write", "users.read", "offline.access"],
                ),
                SocialPlatform::LinkedIn => (
                    "https://www.linkedin.com/oauth/v2/authorization",
                    "https://www.linkedin.com/oauth/v2/accessToken",
                    "https://api.linkedin.com",
                    &["openid", "profile", "email", "w_member_social"],
                ),
                SocialPlatform::Farcaster => ("", "", "", &[]),
            };
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            auth_url: auth_url.to_owned(),
            token_url: token_url.to_owned(),
            api_base_url: api_base_url.to_owned(),
            scopes: scopes.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Whether credentials are present for this platform
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.client_id.is_some() && self.redirect_uri.is_some()
    }
}

/// OAuth settings for every linkable platform
#[derive(Debug, Clone)]
pub struct OAuthProvidersConfig {
    /// X (Twitter) settings
    pub x: OAuthProviderConfig,
    /// `LinkedIn` settings
    pub linkedin: OAuthProviderConfig,
}

impl OAuthProvidersConfig {
    /// Look up the settings for a platform; Farcaster has no OAuth settings
    #[must_use]
    pub const fn provider(&self, platform: SocialPlatform) -> Option<&OAuthProviderConfig> {
        match platform {
            SocialPlatform::X => Some(&self.x),
            SocialPlatform::LinkedIn => Some(&self.linkedin),
            SocialPlatform::Farcaster => None,
        }
    }
}

impl Default for OAuthProvidersConfig {
    fn default() -> Self {
        Self {
            x: OAuthProviderConfig::defaults_for(SocialPlatform::X),
            linkedin: OAuthProviderConfig::defaults_for(SocialPlatform::LinkedIn),
        }
    }
}

/// CORS settings
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Comma-separated origins, or `*`
    pub allowed_origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_owned(),
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// HTTP listen address
    pub host: String,
    /// Deployment environment
    pub environment: Environment,
    /// Database settings
    pub database: DatabaseConfig,
    /// Session and encryption secrets
    pub auth: AuthConfig,
    /// Neynar settings
    pub neynar: NeynarConfig,
    /// OAuth platform settings
    pub oauth: OAuthProvidersConfig,
    /// CORS settings
    pub cors: CorsConfig,
    /// Frontend URL to redirect to after account linking
    pub frontend_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 8081,
            host: "0.0.0.0".to_owned(),
            environment: Environment::Development,
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            neynar: NeynarConfig::default(),
            oauth: OAuthProvidersConfig::default(),
            cors: CorsConfig::default(),
            frontend_url: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from process environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a value cannot be parsed, or if a secret
    /// required in production is missing
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a value cannot be parsed, or if a secret
    /// required in production is missing
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = var("ENVIRONMENT")
            .map(|v| Environment::from_str_or_default(&v))
            .unwrap_or_default();

        let http_port = match var("HTTP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::config(format!("Invalid HTTP_PORT '{raw}': {e}")))?,
            None => 8081,
        };

        let jwt_expiry_hours = match var("JWT_EXPIRY_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| (1..=24 * 30).contains(h))
                .ok_or_else(|| AppError::config(format!("Invalid JWT_EXPIRY_HOURS '{raw}'")))?,
            None => DEFAULT_JWT_EXPIRY_HOURS,
        };

        let auth = AuthConfig {
            jwt_secret: Self::jwt_secret(var("NORA_JWT_SECRET"), environment)?,
            jwt_expiry_hours,
            encryption_key: Self::encryption_key(var("NORA_ENCRYPTION_KEY"), environment)?,
        };

        let neynar_defaults = NeynarConfig::default();
        let neynar = NeynarConfig {
            api_key: var("NEYNAR_API_KEY"),
            base_url: var("NEYNAR_BASE_URL").unwrap_or(neynar_defaults.base_url),
            sign_in_domain: var("FARCASTER_SIGN_IN_DOMAIN")
                .unwrap_or(neynar_defaults.sign_in_domain),
        };

        let oauth = OAuthProvidersConfig {
            x: Self::oauth_provider(&var, "X", SocialPlatform::X),
            linkedin: Self::oauth_provider(&var, "LINKEDIN", SocialPlatform::LinkedIn),
        };

        Ok(Self {
            http_port,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            environment,
            database: DatabaseConfig {
                url: var("DATABASE_URL")
                    .map(|url| DatabaseUrl::parse_url(&url))
                    .unwrap_or_default(),
            },
            auth,
            neynar,
            oauth,
            cors: CorsConfig {
                allowed_origins: var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|| "*".to_owned()),
            },
            frontend_url: var("FRONTEND_URL").map(|url| url.trim_end_matches('/').to_owned()),
        })
    }

    fn jwt_secret(value: Option<String>, environment: Environment) -> AppResult<String> {
        match value {
            Some(secret) if secret.len() >= 32 => Ok(secret),
            Some(_) => Err(AppError::config(
                "NORA_JWT_SECRET must be at least 32 characters",
            )),
            None if environment.is_production() => Err(AppError::config(
                "NORA_JWT_SECRET is required in production",
            )),
            None => {
                warn!("NORA_JWT_SECRET not set, sessions will not survive a restart");
                Ok(generate_token(32))
            }
        }
    }

    fn encryption_key(value: Option<String>, environment: Environment) -> AppResult<[u8; 32]> {
        match value {
            Some(encoded) => {
                let bytes = STANDARD.decode(encoded.trim()).map_err(|e| {
                    AppError::config(format!("NORA_ENCRYPTION_KEY is not valid base64: {e}"))
                })?;
                <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| {
                    AppError::config("NORA_ENCRYPTION_KEY must decode to exactly 32 bytes")
                })
            }
            None if environment.is_production() => Err(AppError::config(
                "NORA_ENCRYPTION_KEY is required in production",
            )),
            None => {
                warn!("NORA_ENCRYPTION_KEY not set, stored OAuth tokens will be unreadable after a restart");
                Ok(generate_encryption_key())
            }
        }
    }

    fn oauth_provider<F>(var: &F, prefix: &str, platform: SocialPlatform) -> OAuthProviderConfig
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = OAuthProviderConfig::defaults_for(platform);
        OAuthProviderConfig {
            client_id: var(&format!("{prefix}_CLIENT_ID")),
            client_secret: var(&format!("{prefix}_CLIENT_SECRET")),
            redirect_uri: var(&format!("{prefix}_REDIRECT_URI")),
            auth_url: var(&format!("{prefix}_AUTH_URL")).unwrap_or(defaults.auth_url),
            token_url: var(&format!("{prefix}_TOKEN_URL")).unwrap_or(defaults.token_url),
            api_base_url: var(&format!("{prefix}_API_BASE_URL"))
                .unwrap_or(defaults.api_base_url),
            scopes: var(&format!("{prefix}_SCOPES")).map_or(defaults.scopes, |raw| {
                raw.split([' ', ','])
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            }),
        }
    }

    /// One-line summary for startup logs (no secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        let linked: Vec<&str> = [SocialPlatform::X, SocialPlatform::LinkedIn]
            .into_iter()
            .filter(|p| self.oauth.provider(*p).is_some_and(OAuthProviderConfig::is_enabled))
            .map(|p| p.as_str())
            .collect();
        format!(
            "Nora Health API: environment={}, port={}, database={}, neynar={}, oauth_platforms=[{}]",
            self.environment,
            self.http_port,
            self.database.url.to_connection_string(),
            if self.neynar.api_key.is_some() {
                "configured"
            } else {
                "missing"
            },
            linked.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_in_development() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_port, 8081);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.neynar.base_url, "https://api.neynar.com");
        assert!(!config.oauth.x.is_enabled());
        assert_eq!(config.auth.jwt_expiry_hours, DEFAULT_JWT_EXPIRY_HOURS);
    }

    #[test]
    fn test_production_requires_secrets() {
        let result = ServerConfig::from_lookup(lookup(&[("ENVIRONMENT", "production")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_encryption_key_length_is_checked() {
        let short = STANDARD.encode([0u8; 16]);
        let result = ServerConfig::from_lookup(lookup(&[("NORA_ENCRYPTION_KEY", &short)]));
        assert!(result.is_err());

        let exact = STANDARD.encode([7u8; 32]);
        let config =
            ServerConfig::from_lookup(lookup(&[("NORA_ENCRYPTION_KEY", &exact)])).unwrap();
        assert_eq!(config.auth.encryption_key, [7u8; 32]);
    }

    #[test]
    fn test_oauth_provider_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("X_CLIENT_ID", "client"),
            ("X_REDIRECT_URI", "https://app.example.com/cb"),
            ("X_TOKEN_URL", "http://127.0.0.1:9999/token"),
            ("X_SCOPES", "tweet.read,tweet.write"),
        ]))
        .unwrap();

        assert!(config.oauth.x.is_enabled());
        assert_eq!(config.oauth.x.token_url, "http://127.0.0.1:9999/token");
        assert_eq!(config.oauth.x.auth_url, "https://twitter.com/i/oauth2/authorize");
        assert_eq!(config.oauth.x.scopes, vec!["tweet.read", "tweet.write"]);
        assert!(config.summary().contains("oauth_platforms=[x]"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("HTTP_PORT", "not-a-port")])).is_err());
    }

    #[test]
    fn test_database_url_parsing() {
        assert_eq!(DatabaseUrl::parse_url("sqlite::memory:"), DatabaseUrl::Memory);
        assert_eq!(
            DatabaseUrl::parse_url("sqlite:./data/test.db"),
            DatabaseUrl::SQLite {
                path: PathBuf::from("./data/test.db")
            }
        );
        assert_eq!(
            DatabaseUrl::parse_url("/var/lib/nora.db").to_connection_string(),
            "sqlite:/var/lib/nora.db"
        );
    }
}
