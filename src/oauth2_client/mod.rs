// ABOUTME: OAuth 2.0 client used to link X and LinkedIn accounts
// ABOUTME: Authorization code flow with optional PKCE, refresh grant, and profile lookup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # OAuth 2.0 Client Module
//!
//! The server acts as an OAuth 2.0 client of the social platforms users link
//! for publishing. This module handles:
//! - authorization URLs, with PKCE S256 where the platform requires it
//! - code exchange and refresh grants
//! - reading the linked identity from the platform API

/// Core OAuth 2.0 client implementation
pub mod client;
/// Platform identity lookups after authorization
pub mod platforms;

pub use client::{
    ClientAuthMethod, OAuth2Client, OAuth2Config, OAuth2Token, PkceParams, PKCE_CHALLENGE_METHOD,
};
pub use platforms::{fetch_platform_profile, PlatformProfile};
