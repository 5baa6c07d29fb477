// ABOUTME: Use-case layer between route handlers and repositories
// ABOUTME: Each operation fetches, validates, mutates, and returns a domain value
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! Domain service layer
//!
//! Services are free functions over [`crate::resources::ServerResources`] (or
//! just the [`crate::database::Database`] when nothing else is needed). They
//! take `now` explicitly so that expiry rules are testable.

/// Linked social accounts and OAuth 2.0 linking
pub mod accounts;
/// Farcaster sign-in, session refresh and logout
pub mod auth;
/// Coaching conversation threads
pub mod conversations;
/// Health profile and derived metrics
pub mod health;
/// Meals and daily meal plans
pub mod meals;
/// Post drafting and listing
pub mod posts;
/// Per-platform publishing
pub mod publishers;
/// Neynar signer management
pub mod signers;
/// Sign-In-With-Farcaster message parsing
pub mod siwf;
/// Current user profile
pub mod users;
/// Shared input normalization and validation
pub mod validation;
/// Marketing waitlist
pub mod waitlist;
/// Workouts, sessions and daily workout plans
pub mod workouts;
