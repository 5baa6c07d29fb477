// ABOUTME: Repository traits defining the persistence operations of each feature
// ABOUTME: Implemented on Database; services depend on these contracts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

//! Repository contracts
//!
//! Every method that reads or writes a user-owned row takes the owning
//! `user_id`; a row owned by someone else is indistinguishable from a missing
//! one. `get`/`list` methods return active rows only unless stated otherwise.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{
    AgentConversation, AuthProfile, AuthProvider, AuthToken, AuthTokenType, ConnectedAccount,
    DailyMealPlan, DailyWorkoutPlan, HealthProfile, Meal, MealType, NeynarSigner, Post,
    PostPlatform, PostStatus, SignerStatus, SocialPlatform, StoredOAuthToken, User,
    WaitlistEntry, Workout, WorkoutSession,
};
use crate::pagination::{CursorPage, PaginationParams};

/// Users and their sign-in identities
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user
    async fn create_user(&self, user: &User) -> AppResult<()>;

    /// Active user by id
    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Active user by email (case-insensitive)
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Persist editable profile fields
    async fn update_user(&self, user: &User) -> AppResult<()>;

    /// Soft-delete a user and release their signers
    async fn soft_delete_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool>;

    /// Identity a user holds with a provider
    async fn get_auth_profile_for_user(
        &self,
        user_id: Uuid,
        provider: AuthProvider,
    ) -> AppResult<Option<AuthProfile>>;

    /// Find the active user owning `snapshot`'s identity, or create one seeded
    /// from the snapshot. The identity snapshot is refreshed either way.
    /// Returns the user and whether it was created.
    async fn find_or_create_by_auth_profile(
        &self,
        snapshot: &AuthProfile,
        now: DateTime<Utc>,
    ) -> AppResult<(User, bool)>;

    /// Record a Farcaster sign-in atomically: find or create the user behind
    /// `snapshot` (seeding `bio` on creation), then claim `signer` and upsert
    /// `account` for that user. The `user_id` of `signer` and `account` is
    /// replaced by the resolved user's id.
    ///
    /// Returns `None`, with nothing written, when the signer belongs to
    /// another active user.
    async fn reconcile_farcaster_sign_in(
        &self,
        snapshot: &AuthProfile,
        bio: Option<&str>,
        signer: &NeynarSigner,
        account: &ConnectedAccount,
        now: DateTime<Utc>,
    ) -> AppResult<Option<(User, bool)>>;
}

/// Single-use hashed tokens
#[async_trait]
pub trait AuthTokenRepository: Send + Sync {
    /// Store a token
    async fn store_token(&self, token: &AuthToken) -> AppResult<()>;

    /// Atomically mark an unexpired, unconsumed token as consumed and return it
    async fn consume_token(
        &self,
        token_type: AuthTokenType,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<AuthToken>>;

    /// Consume every outstanding token of a type for a user
    async fn revoke_user_tokens(
        &self,
        user_id: Uuid,
        token_type: AuthTokenType,
        now: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Delete tokens that expired before `now`
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> AppResult<u64>;
}

/// Posts and their per-platform delivery rows
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a post with its platform rows
    async fn create_post(&self, post: &Post) -> AppResult<()>;

    /// Active post with platform rows
    async fn get_post(&self, user_id: Uuid, post_id: Uuid) -> AppResult<Option<Post>>;

    /// Page of posts, newest first
    async fn list_posts(
        &self,
        user_id: Uuid,
        status: Option<PostStatus>,
        include_deleted: bool,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<Post>>;

    /// Persist content, media, status and timestamps; optionally replace the
    /// platform rows with `post.platforms`
    async fn update_post(&self, post: &Post, replace_platforms: bool) -> AppResult<()>;

    /// Persist one delivery row
    async fn update_post_platform(&self, platform: &PostPlatform) -> AppResult<()>;

    /// Soft-delete a post
    async fn soft_delete_post(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Connected social accounts and their OAuth grants
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Active account by id
    async fn get_account(&self, user_id: Uuid, account_id: Uuid)
        -> AppResult<Option<ConnectedAccount>>;

    /// Active accounts of a user
    async fn list_accounts(&self, user_id: Uuid) -> AppResult<Vec<ConnectedAccount>>;

    /// Most recently linked active account on a platform
    async fn get_active_account_for_platform(
        &self,
        user_id: Uuid,
        platform: SocialPlatform,
    ) -> AppResult<Option<ConnectedAccount>>;

    /// Insert the account, or refresh and restore the existing row for the
    /// same user and platform identity
    async fn upsert_account(&self, account: &ConnectedAccount) -> AppResult<ConnectedAccount>;

    /// Soft-delete an account and drop its grant
    async fn soft_delete_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Insert or replace the grant of an account
    async fn upsert_oauth_token(&self, token: &StoredOAuthToken) -> AppResult<()>;

    /// Grant of an account
    async fn get_oauth_token(&self, account_id: Uuid) -> AppResult<Option<StoredOAuthToken>>;
}

/// Neynar signers
#[async_trait]
pub trait SignerRepository: Send + Sync {
    /// Signer by uuid, whoever owns it, including soft-deleted rows
    async fn get_signer_by_uuid(&self, signer_uuid: &str) -> AppResult<Option<NeynarSigner>>;

    /// Insert or refresh (and restore) a signer. Returns `None` when the uuid
    /// belongs to another active user; a deleted user's signer is taken over.
    async fn upsert_signer(&self, signer: &NeynarSigner) -> AppResult<Option<NeynarSigner>>;

    /// Active signers of a user, newest first
    async fn list_signers(&self, user_id: Uuid) -> AppResult<Vec<NeynarSigner>>;

    /// Newest active approved signer of a user
    async fn latest_approved_signer(&self, user_id: Uuid) -> AppResult<Option<NeynarSigner>>;

    /// Persist status fields reported by Neynar
    async fn update_signer_status(
        &self,
        signer_id: Uuid,
        status: SignerStatus,
        fid: Option<i64>,
        approval_url: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Soft-delete a signer
    async fn soft_delete_signer(
        &self,
        user_id: Uuid,
        signer_uuid: &str,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Health profiles
#[async_trait]
pub trait HealthProfileRepository: Send + Sync {
    /// Active profile of a user
    async fn get_health_profile(&self, user_id: Uuid) -> AppResult<Option<HealthProfile>>;

    /// Insert a profile
    async fn create_health_profile(&self, profile: &HealthProfile) -> AppResult<()>;

    /// Persist every field of an active profile
    async fn update_health_profile(&self, profile: &HealthProfile) -> AppResult<()>;

    /// Soft-delete the active profile
    async fn soft_delete_health_profile(&self, user_id: Uuid, now: DateTime<Utc>)
        -> AppResult<bool>;
}

/// Meals and daily meal plans
#[async_trait]
pub trait MealRepository: Send + Sync {
    /// Insert a meal
    async fn create_meal(&self, meal: &Meal) -> AppResult<()>;

    /// Active meal by id
    async fn get_meal(&self, user_id: Uuid, meal_id: Uuid) -> AppResult<Option<Meal>>;

    /// Active meals among `meal_ids`, in any order
    async fn get_meals_by_ids(&self, user_id: Uuid, meal_ids: &[Uuid]) -> AppResult<Vec<Meal>>;

    /// Page of meals, newest first
    async fn list_meals(
        &self,
        user_id: Uuid,
        meal_type: Option<MealType>,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<Meal>>;

    /// Persist every editable field
    async fn update_meal(&self, meal: &Meal) -> AppResult<()>;

    /// Soft-delete a meal
    async fn soft_delete_meal(&self, user_id: Uuid, meal_id: Uuid, now: DateTime<Utc>)
        -> AppResult<bool>;

    /// Insert a plan; a second active plan for the same date is rejected
    async fn create_meal_plan(&self, plan: &DailyMealPlan) -> AppResult<()>;

    /// Active plan by id
    async fn get_meal_plan(&self, user_id: Uuid, plan_id: Uuid) -> AppResult<Option<DailyMealPlan>>;

    /// Active plan for a date
    async fn get_meal_plan_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<DailyMealPlan>>;

    /// Active plans in an inclusive date range, oldest first
    async fn list_meal_plans(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<DailyMealPlan>>;

    /// Soft-delete a plan
    async fn soft_delete_meal_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Workouts, sessions and daily workout plans
#[async_trait]
pub trait WorkoutRepository: Send + Sync {
    /// Insert a workout
    async fn create_workout(&self, workout: &Workout) -> AppResult<()>;

    /// Active workout by id
    async fn get_workout(&self, user_id: Uuid, workout_id: Uuid) -> AppResult<Option<Workout>>;

    /// Active workouts among `workout_ids`
    async fn get_workouts_by_ids(
        &self,
        user_id: Uuid,
        workout_ids: &[Uuid],
    ) -> AppResult<Vec<Workout>>;

    /// Page of workouts, newest first
    async fn list_workouts(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<Workout>>;

    /// Persist every editable field
    async fn update_workout(&self, workout: &Workout) -> AppResult<()>;

    /// Soft-delete a workout
    async fn soft_delete_workout(
        &self,
        user_id: Uuid,
        workout_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Insert a session
    async fn create_session(&self, session: &WorkoutSession) -> AppResult<()>;

    /// Active session by id
    async fn get_session(&self, user_id: Uuid, session_id: Uuid)
        -> AppResult<Option<WorkoutSession>>;

    /// Page of sessions, newest first
    async fn list_sessions(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<WorkoutSession>>;

    /// Mark an open session completed; returns false if it was already completed
    async fn complete_session(&self, session: &WorkoutSession) -> AppResult<bool>;

    /// Soft-delete a session
    async fn soft_delete_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// Insert a plan; a second active plan for the same date is rejected
    async fn create_workout_plan(&self, plan: &DailyWorkoutPlan) -> AppResult<()>;

    /// Active plan by id
    async fn get_workout_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<Option<DailyWorkoutPlan>>;

    /// Active plan for a date
    async fn get_workout_plan_by_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<DailyWorkoutPlan>>;

    /// Active plans in an inclusive date range, oldest first
    async fn list_workout_plans(
        &self,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<DailyWorkoutPlan>>;

    /// Soft-delete a plan
    async fn soft_delete_workout_plan(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Coaching conversations
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Insert a conversation
    async fn create_conversation(&self, conversation: &AgentConversation) -> AppResult<()>;

    /// Active conversation by id
    async fn get_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
    ) -> AppResult<Option<AgentConversation>>;

    /// Page of conversations, newest first
    async fn list_conversations(
        &self,
        user_id: Uuid,
        params: &PaginationParams,
    ) -> AppResult<CursorPage<AgentConversation>>;

    /// Persist title, messages and `updated_at`
    async fn update_conversation(&self, conversation: &AgentConversation) -> AppResult<()>;

    /// Soft-delete a conversation
    async fn soft_delete_conversation(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Marketing waitlist
#[async_trait]
pub trait WaitlistRepository: Send + Sync {
    /// Insert an entry unless the email is already present. Returns the stored
    /// entry and whether it was inserted.
    async fn join_waitlist(&self, entry: &WaitlistEntry) -> AppResult<(WaitlistEntry, bool)>;

    /// Number of entries
    async fn count_waitlist_entries(&self) -> AppResult<i64>;
}
