// ABOUTME: Third-party API clients used by the server
// ABOUTME: Neynar for Farcaster data and casts, plus shared reqwest client builders
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! External API Clients

/// Shared reqwest client construction
pub mod http_client;
/// Neynar Farcaster API client
pub mod neynar;

pub use neynar::{CastResult, FarcasterUser, NeynarClient, SignerInfo};
