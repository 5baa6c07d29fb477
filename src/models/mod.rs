// ABOUTME: Domain models for users, social posting, and health coaching data
// ABOUTME: Plain structs and string-coded enums shared by the database, services and routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! # Data Models
//!
//! Every persisted entity carries a UUID id and millisecond-precision UTC
//! timestamps. Entities that support soft deletion expose `deleted_at`.
//! Enums stored in the database implement [`std::str::FromStr`] and `as_str`
//! with the same lowercase codes used on the wire.

/// Implements `as_str`, `Display` and `FromStr` for a unit-variant enum
macro_rules! string_enum {
    ($name:ident, $label:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $name {
            /// Database and wire representation
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// Every variant, in declaration order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::errors::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($code => Ok(Self::$variant),)+
                    _ => Err($crate::errors::AppError::invalid_input(format!(
                        "Invalid {}: {s}",
                        $label
                    ))),
                }
            }
        }
    };
}

mod account;
mod conversation;
mod health;
mod meal;
mod post;
mod signer;
mod token;
mod user;
mod waitlist;
mod workout;

pub use account::{ConnectedAccount, SocialPlatform, StoredOAuthToken};
pub use conversation::{AgentConversation, ConversationMessage, MessageRole};
pub use health::{ActivityLevel, HealthMetrics, HealthProfile, Sex};
pub use meal::{DailyMealPlan, Meal, MealType};
pub use post::{PlatformPostStatus, Post, PostPlatform, PostStatus};
pub use signer::{NeynarSigner, SignerStatus};
pub use token::{AuthToken, AuthTokenType};
pub use user::{AuthProfile, AuthProvider, User};
pub use waitlist::WaitlistEntry;
pub use workout::{DailyWorkoutPlan, Difficulty, Exercise, Workout, WorkoutSession, WorkoutType};
