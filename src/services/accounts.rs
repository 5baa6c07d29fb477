// ABOUTME: Social account linking over OAuth 2.0 and access to stored grants
// ABOUTME: OAuth state is single use; tokens are encrypted at rest and refreshed near expiry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

use chrono::{DateTime, Duration, Utc};
use nora_core::constants::tokens::OAUTH_STATE_EXPIRY_MINUTES;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::environment::OAuthProviderConfig;
use crate::crypto::{generate_token, hash_token};
use crate::database::{AccountRepository, AuthTokenRepository, Database};
use crate::errors::{AppError, AppResult};
use crate::logging::AppLogger;
use crate::models::{
    AuthToken, AuthTokenType, ConnectedAccount, SocialPlatform, StoredOAuthToken,
};
use crate::oauth2_client::{
    fetch_platform_profile, OAuth2Client, OAuth2Config, OAuth2Token, PkceParams,
};
use crate::resources::ServerResources;

const STATE_BYTES: usize = 32;

/// Where to send the user to authorize the link
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationRequest {
    /// Platform being linked
    pub platform: SocialPlatform,
    /// Provider authorization URL including state (and PKCE challenge)
    pub authorization_url: String,
    /// When the state stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Query parameters the provider sends to the callback
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OAuthCallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// State issued by [`begin_link`]
    pub state: Option<String>,
    /// Provider error code
    pub error: Option<String>,
    /// Provider error description
    pub error_description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StatePayload {
    platform: SocialPlatform,
    code_verifier: Option<String>,
}

fn provider_config(
    resources: &ServerResources,
    platform: SocialPlatform,
) -> AppResult<&OAuthProviderConfig> {
    resources.config.oauth.provider(platform).ok_or_else(|| {
        AppError::invalid_input("Farcaster accounts are linked through sign-in")
    })
}

fn oauth_client(resources: &ServerResources, platform: SocialPlatform) -> AppResult<OAuth2Client> {
    let config = OAuth2Config::for_platform(platform, provider_config(resources, platform)?)?;
    Ok(OAuth2Client::new(config, resources.http_client.clone()))
}

/// Start linking an account: store state and build the authorization URL
///
/// # Errors
///
/// Returns invalid input for Farcaster, a configuration error if the platform
/// is not configured, and database errors
pub async fn begin_link(
    resources: &ServerResources,
    user_id: Uuid,
    platform: SocialPlatform,
    now: DateTime<Utc>,
) -> AppResult<AuthorizationRequest> {
    let client = oauth_client(resources, platform)?;
    let state = generate_token(STATE_BYTES);
    let pkce = platform.uses_pkce().then(PkceParams::generate);
    let authorization_url = client.get_authorization_url(&state, pkce.as_ref())?;
    let expires_at = now + Duration::minutes(OAUTH_STATE_EXPIRY_MINUTES);

    let payload = StatePayload {
        platform,
        code_verifier: pkce.map(|p| p.code_verifier),
    };
    resources
        .database
        .store_token(&AuthToken {
            id: Uuid::new_v4(),
            user_id: Some(user_id),
            token_type: AuthTokenType::OAuthState,
            token_hash: hash_token(&state),
            payload: Some(serde_json::to_value(&payload)?),
            expires_at,
            consumed_at: None,
            created_at: now,
        })
        .await?;

    AppLogger::log_oauth_event(&user_id.to_string(), platform.as_str(), "authorize", true);
    Ok(AuthorizationRequest {
        platform,
        authorization_url,
        expires_at,
    })
}

/// Finish linking: consume state, exchange the code, and store account and grant
///
/// # Errors
///
/// Returns invalid input for provider errors or missing parameters, an
/// authentication error for unknown or expired state, and external errors from
/// the provider
pub async fn complete_link(
    resources: &ServerResources,
    platform: SocialPlatform,
    params: OAuthCallbackParams,
    now: DateTime<Utc>,
) -> AppResult<ConnectedAccount> {
    let database = &resources.database;

    if let Some(error) = params.error {
        // Burn the state so the request cannot be replayed
        if let Some(state) = params.state.as_deref() {
            database
                .consume_token(AuthTokenType::OAuthState, &hash_token(state), now)
                .await?;
        }
        warn!(%platform, %error, "Provider denied account linking");
        return Err(AppError::invalid_input(
            params.error_description.unwrap_or(error),
        ));
    }

    let (Some(code), Some(state)) = (params.code, params.state) else {
        return Err(AppError::invalid_input(
            "Callback requires code and state parameters",
        ));
    };

    let stored = database
        .consume_token(AuthTokenType::OAuthState, &hash_token(&state), now)
        .await?
        .ok_or_else(|| AppError::auth_invalid("Invalid or expired OAuth state"))?;
    let user_id = stored
        .user_id
        .ok_or_else(|| AppError::auth_invalid("OAuth state has no user"))?;
    let payload: StatePayload = stored
        .payload
        .map(serde_json::from_value)
        .transpose()?
        .ok_or_else(|| AppError::auth_invalid("OAuth state is missing its payload"))?;
    if payload.platform != platform {
        return Err(AppError::invalid_input(
            "OAuth state was issued for a different platform",
        ));
    }

    let client = oauth_client(resources, platform)?;
    let pkce = payload.code_verifier.map(PkceParams::from_verifier);
    let token = client.exchange_code(&code, pkce.as_ref(), now).await?;

    let provider = provider_config(resources, platform)?;
    let profile = fetch_platform_profile(
        &resources.http_client,
        platform,
        &provider.api_base_url,
        &token.access_token,
    )
    .await?;

    let account = database
        .upsert_account(&ConnectedAccount {
            id: Uuid::new_v4(),
            user_id,
            platform,
            platform_user_id: profile.platform_user_id,
            username: profile.username,
            display_name: profile.display_name,
            avatar_url: profile.avatar_url,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
        .await?;

    store_grant(resources, account.id, &token, now).await?;

    AppLogger::log_oauth_event(&user_id.to_string(), platform.as_str(), "link", true);
    info!(user.id = %user_id, %platform, account.id = %account.id, "Account linked");
    Ok(account)
}

async fn store_grant(
    resources: &ServerResources,
    account_id: Uuid,
    token: &OAuth2Token,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let refresh_token = token
        .refresh_token
        .as_deref()
        .map(|t| resources.cipher.encrypt(t))
        .transpose()?;
    resources
        .database
        .upsert_oauth_token(&StoredOAuthToken {
            connected_account_id: account_id,
            access_token: resources.cipher.encrypt(&token.access_token)?,
            refresh_token,
            token_type: token.token_type.clone(),
            scope: token.scope.clone(),
            expires_at: token.expires_at,
            updated_at: now,
        })
        .await
}

/// Active linked accounts of a user
///
/// # Errors
///
/// Returns a database error if the query fails
pub async fn list_accounts(database: &Database, user_id: Uuid) -> AppResult<Vec<ConnectedAccount>> {
    database.list_accounts(user_id).await
}

/// Soft-delete a linked account and drop its grant
///
/// # Errors
///
/// Returns not found if the user has no such active account
pub async fn unlink(
    database: &Database,
    user_id: Uuid,
    account_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let account = database
        .get_account(user_id, account_id)
        .await?
        .ok_or_else(|| AppError::not_found("Connected account"))?;
    if !database
        .soft_delete_account(user_id, account_id, now)
        .await?
    {
        return Err(AppError::not_found("Connected account"));
    }
    AppLogger::log_oauth_event(&user_id.to_string(), account.platform.as_str(), "unlink", true);
    Ok(())
}

/// Plaintext access token for an account, refreshed first when it is about to expire
///
/// # Errors
///
/// Returns an external auth error when no grant is stored, or when the grant
/// has expired and cannot be refreshed
pub async fn access_token_for(
    resources: &ServerResources,
    account: &ConnectedAccount,
    now: DateTime<Utc>,
) -> AppResult<String> {
    let platform = account.platform.to_string();
    let stored = resources
        .database
        .get_oauth_token(account.id)
        .await?
        .ok_or_else(|| {
            AppError::external_auth_failed(&platform, "No grant stored; reconnect the account")
        })?;

    let current = OAuth2Token {
        access_token: resources.cipher.decrypt(&stored.access_token)?,
        token_type: stored.token_type,
        expires_at: stored.expires_at,
        refresh_token: stored
            .refresh_token
            .as_deref()
            .map(|t| resources.cipher.decrypt(t))
            .transpose()?,
        scope: stored.scope,
    };

    if !current.will_expire_soon(now) {
        return Ok(current.access_token);
    }

    let Some(refresh_token) = current.refresh_token.as_deref() else {
        if current.expires_at.is_some_and(|t| t <= now) {
            return Err(AppError::external_auth_failed(
                &platform,
                "Access token expired and no refresh token is available; reconnect the account",
            ));
        }
        return Ok(current.access_token);
    };

    let refreshed = oauth_client(resources, account.platform)?
        .refresh_token(refresh_token, now)
        .await?;
    store_grant(resources, account.id, &refreshed, now).await?;
    AppLogger::log_oauth_event(&account.user_id.to_string(), &platform, "refresh", true);
    Ok(refreshed.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_payload_round_trip_shape() {
        let payload = StatePayload {
            platform: SocialPlatform::X,
            code_verifier: Some("verifier".to_owned()),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["platform"], "x");
        assert_eq!(value["code_verifier"], "verifier");
    }
}
