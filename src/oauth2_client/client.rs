// ABOUTME: Generic OAuth 2.0 authorization code client with PKCE support
// ABOUTME: Builds authorization URLs and performs code and refresh token grants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use nora_core::constants::tokens::{OAUTH_REFRESH_MARGIN_SECONDS, PKCE_VERIFIER_LENGTH};
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::config::environment::OAuthProviderConfig;
use crate::errors::{AppError, AppResult};
use crate::models::SocialPlatform;

/// Only challenge method we send
pub const PKCE_CHALLENGE_METHOD: &str = "S256";

/// Where client credentials go on token requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `Authorization: Basic` header (X)
    Basic,
    /// `client_id` and `client_secret` form fields (LinkedIn)
    RequestBody,
}

/// Registered app for one linkable platform
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Platform the app is registered with
    pub platform: SocialPlatform,
    /// App id issued by the platform
    pub client_id: String,
    /// App secret; absent for public clients
    pub client_secret: Option<String>,
    /// Consent page users are sent to
    pub auth_url: String,
    /// Code and refresh grant endpoint
    pub token_url: String,
    /// Our callback, exactly as registered with the platform
    pub redirect_uri: String,
    /// Scopes requested at consent time
    pub scopes: Vec<String>,
    /// Send a PKCE challenge and verifier
    pub use_pkce: bool,
    /// Credential placement on token requests
    pub client_auth: ClientAuthMethod,
}

impl OAuth2Config {
    /// Resolve the app registration for `platform`
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no client id or redirect URI is set
    pub fn for_platform(platform: SocialPlatform, provider: &OAuthProviderConfig) -> AppResult<Self> {
        let client_id = provider.client_id.clone();
        let redirect_uri = provider.redirect_uri.clone();
        let (Some(client_id), Some(redirect_uri)) = (client_id, redirect_uri) else {
            return Err(AppError::config(format!(
                "{platform} account linking is not configured"
            )));
        };

        let client_auth = if platform == SocialPlatform::X {
            ClientAuthMethod::Basic
        } else {
            ClientAuthMethod::RequestBody
        };

        Ok(Self {
            platform,
            client_id,
            client_secret: provider.client_secret.clone(),
            auth_url: provider.auth_url.clone(),
            token_url: provider.token_url.clone(),
            redirect_uri,
            scopes: provider.scopes.clone(),
            use_pkce: platform.uses_pkce(),
            client_auth,
        })
    }
}

/// Verifier and derived `S256` challenge for one authorization attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceParams {
    /// Kept server-side in the link state until the callback
    pub code_verifier: String,
    /// `BASE64URL(SHA256(code_verifier))`, sent on the consent URL
    pub code_challenge: String,
}

impl PkceParams {
    /// Fresh random verifier
    #[must_use]
    pub fn generate() -> Self {
        let verifier = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PKCE_VERIFIER_LENGTH)
            .map(char::from)
            .collect();
        Self::from_verifier(verifier)
    }

    /// Recompute the challenge for a verifier read back from storage
    #[must_use]
    pub fn from_verifier(code_verifier: String) -> Self {
        let code_challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(&code_verifier));
        Self {
            code_verifier,
            code_challenge,
        }
    }
}

/// Grant held for a linked account; secrets are never printed by `Debug`
#[derive(Clone)]
pub struct OAuth2Token {
    /// Bearer credential for platform API calls
    pub access_token: String,
    /// Normally `Bearer`
    pub token_type: String,
    /// `None` when the platform did not send `expires_in`
    pub expires_at: Option<DateTime<Utc>>,
    /// Present only when the platform issues offline access
    pub refresh_token: Option<String>,
    /// Space separated scopes actually granted
    pub scope: Option<String>,
}

impl std::fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl OAuth2Token {
    /// True once `now` is inside the refresh margin before expiry
    ///
    /// Grants without an expiry never need refreshing.
    #[must_use]
    pub fn will_expire_soon(&self, now: DateTime<Utc>) -> bool {
        let margin = Duration::seconds(OAUTH_REFRESH_MARGIN_SECONDS);
        matches!(self.expires_at, Some(at) if at - margin <= now)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    refresh_token: Option<String>,
    scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_owned()
}

/// RFC 6749 section 5.2 error body
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Authorization code flow against one platform
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    config: OAuth2Config,
    client: reqwest::Client,
}

impl OAuth2Client {
    /// Client sharing the server's HTTP connection pool
    #[must_use]
    pub const fn new(config: OAuth2Config, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Consent URL for `state`, carrying the PKCE challenge when the platform uses one
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the configured auth URL does not parse
    pub fn get_authorization_url(&self, state: &str, pkce: Option<&PkceParams>) -> AppResult<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| AppError::config(format!("Invalid auth URL: {e}")))?;

        let scope = self.config.scopes.join(" ");
        let mut pairs = vec![
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
        ];
        if let Some(pkce) = pkce.filter(|_| self.config.use_pkce) {
            pairs.push(("code_challenge", pkce.code_challenge.as_str()));
            pairs.push(("code_challenge_method", PKCE_CHALLENGE_METHOD));
        }
        url.query_pairs_mut().extend_pairs(pairs);

        Ok(url.into())
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the code or the response is invalid
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce: Option<&PkceParams>,
        now: DateTime<Utc>,
    ) -> AppResult<OAuth2Token> {
        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(pkce) = pkce.filter(|_| self.config.use_pkce) {
            params.push(("code_verifier", pkce.code_verifier.as_str()));
        }
        self.token_request(params, now).await
    }

    /// Refresh an expiring access token
    ///
    /// # Errors
    ///
    /// Returns an error if the provider rejects the refresh token
    pub async fn refresh_token(
        &self,
        refresh_token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<OAuth2Token> {
        let params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.token_request(params, now).await
    }

    async fn token_request(
        &self,
        mut params: Vec<(&str, &str)>,
        now: DateTime<Utc>,
    ) -> AppResult<OAuth2Token> {
        let platform = self.config.platform.to_string();
        let mut request = self.client.post(&self.config.token_url);
        match self.config.client_auth {
            ClientAuthMethod::Basic => {
                request = request.basic_auth(
                    &self.config.client_id,
                    self.config.client_secret.as_deref(),
                );
                // Public clients identify themselves in the body
                if self.config.client_secret.is_none() {
                    params.push(("client_id", self.config.client_id.as_str()));
                }
            }
            ClientAuthMethod::RequestBody => {
                params.push(("client_id", self.config.client_id.as_str()));
                if let Some(secret) = self.config.client_secret.as_deref() {
                    params.push(("client_secret", secret));
                }
            }
        }

        let response = request.form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<TokenErrorResponse>(&body).map_or_else(
                |_| format!("token endpoint returned HTTP {status}"),
                |e| e.error_description.unwrap_or(e.error),
            );
            debug!(%platform, %status, "OAuth token request rejected");
            return Err(AppError::external_auth_failed(platform, message));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            AppError::external_service(platform, format!("Invalid token response: {e}"))
        })?;
        Ok(Self::token_from_response(token, now))
    }

    fn token_from_response(response: TokenResponse, now: DateTime<Utc>) -> OAuth2Token {
        OAuth2Token {
            access_token: response.access_token,
            token_type: response.token_type,
            // A lifetime too large to represent is treated as non-expiring
            expires_at: response
                .expires_in
                .and_then(Duration::try_seconds)
                .and_then(|lifetime| now.checked_add_signed(lifetime)),
            refresh_token: response.refresh_token,
            scope: response.scope,
        }
    }
}
