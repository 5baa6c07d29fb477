// ABOUTME: Repository tests against in-memory and file-backed SQLite databases
// ABOUTME: Covers identity resolution, single-use tokens, signer ownership and keyset pagination
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Nora Health

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use chrono::{Duration, Utc};
use common::{create_test_database, create_test_user};
use nora_health_server::{
    database::{
        AuthTokenRepository, Database, PostRepository, SignerRepository, UserRepository,
        WaitlistRepository,
    },
    models::{
        AuthProfile, AuthProvider, AuthToken, AuthTokenType, NeynarSigner, Post, PostStatus,
        SignerStatus, WaitlistEntry,
    },
    pagination::PaginationParams,
};
use uuid::Uuid;

fn farcaster_snapshot(fid: i64, username: &str) -> AuthProfile {
    let now = Utc::now();
    AuthProfile {
        id: Uuid::new_v4(),
        user_id: Uuid::nil(),
        provider: AuthProvider::Farcaster,
        provider_user_id: fid.to_string(),
        username: Some(username.to_owned()),
        display_name: None,
        avatar_url: None,
        custody_address: Some("0x1234".to_owned()),
        created_at: now,
        updated_at: now,
    }
}

fn token(token_type: AuthTokenType, hash: &str, expires_in: Duration) -> AuthToken {
    let now = Utc::now();
    AuthToken {
        id: Uuid::new_v4(),
        user_id: None,
        token_type,
        token_hash: hash.to_owned(),
        payload: None,
        expires_at: now + expires_in,
        consumed_at: None,
        created_at: now,
    }
}

#[tokio::test]
async fn test_find_or_create_resolves_identity_once() {
    let db = create_test_database().await;
    let now = Utc::now();

    let (user, created) = db
        .find_or_create_by_auth_profile(&farcaster_snapshot(99, "bob"), now)
        .await
        .unwrap();
    assert!(created);
    assert_eq!(user.username.as_deref(), Some("bob"));

    // Later sign-ins refresh the snapshot but keep the user
    let (again, created) = db
        .find_or_create_by_auth_profile(&farcaster_snapshot(99, "bobby"), now)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, user.id);
    let profile = db
        .get_auth_profile_for_user(user.id, AuthProvider::Farcaster)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.username.as_deref(), Some("bobby"));

    // A deleted user's identity starts a fresh account
    assert!(db.soft_delete_user(user.id, now).await.unwrap());
    let (fresh, created) = db
        .find_or_create_by_auth_profile(&farcaster_snapshot(99, "bob"), now)
        .await
        .unwrap();
    assert!(created);
    assert_ne!(fresh.id, user.id);
    assert!(db.get_user(user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_tokens_are_single_use_and_typed() {
    let db = create_test_database().await;
    let now = Utc::now();

    db.store_token(&token(AuthTokenType::Nonce, "nonce-hash", Duration::minutes(5)))
        .await
        .unwrap();

    assert!(db
        .consume_token(AuthTokenType::Refresh, "nonce-hash", now)
        .await
        .unwrap()
        .is_none());
    let consumed = db
        .consume_token(AuthTokenType::Nonce, "nonce-hash", now)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(consumed.consumed_at.map(|t| t.timestamp()), Some(now.timestamp()));
    assert!(db
        .consume_token(AuthTokenType::Nonce, "nonce-hash", now)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_expired_tokens_are_rejected_and_purged() {
    let db = create_test_database().await;
    let now = Utc::now();

    db.store_token(&token(AuthTokenType::Nonce, "stale", Duration::minutes(-1)))
        .await
        .unwrap();
    db.store_token(&token(AuthTokenType::Nonce, "fresh", Duration::minutes(5)))
        .await
        .unwrap();

    assert!(db
        .consume_token(AuthTokenType::Nonce, "stale", now)
        .await
        .unwrap()
        .is_none());
    assert_eq!(db.delete_expired_tokens(now).await.unwrap(), 1);
    assert!(db
        .consume_token(AuthTokenType::Nonce, "fresh", now)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_revoke_user_tokens() {
    let db = create_test_database().await;
    let user = create_test_user(&db, 5).await;
    let now = Utc::now();

    for hash in ["r1", "r2"] {
        let mut refresh = token(AuthTokenType::Refresh, hash, Duration::days(30));
        refresh.user_id = Some(user.id);
        db.store_token(&refresh).await.unwrap();
    }

    assert_eq!(
        db.revoke_user_tokens(user.id, AuthTokenType::Refresh, now)
            .await
            .unwrap(),
        2
    );
    assert!(db
        .consume_token(AuthTokenType::Refresh, "r1", now)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_signer_cannot_move_between_users() {
    let db = create_test_database().await;
    let owner = create_test_user(&db, 1).await;
    let intruder = create_test_user(&db, 2).await;
    let now = Utc::now();

    let signer = |user_id: Uuid, status: SignerStatus| NeynarSigner {
        id: Uuid::new_v4(),
        user_id,
        signer_uuid: "shared-signer".to_owned(),
        public_key: "0xabc".to_owned(),
        fid: Some(1),
        status,
        approval_url: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    let stored = db
        .upsert_signer(&signer(owner.id, SignerStatus::PendingApproval))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.user_id, owner.id);

    assert!(db
        .upsert_signer(&signer(intruder.id, SignerStatus::Approved))
        .await
        .unwrap()
        .is_none());
    assert!(db.latest_approved_signer(owner.id).await.unwrap().is_none());

    db.upsert_signer(&signer(owner.id, SignerStatus::Approved))
        .await
        .unwrap()
        .unwrap();
    let approved = db.latest_approved_signer(owner.id).await.unwrap().unwrap();
    assert_eq!(approved.signer_uuid, "shared-signer");
    assert_eq!(approved.id, stored.id);
}

#[tokio::test]
async fn test_deleted_user_releases_signers() {
    let db = create_test_database().await;
    let now = Utc::now();
    let (former, _) = db
        .find_or_create_by_auth_profile(&farcaster_snapshot(31, "old"), now)
        .await
        .unwrap();
    let (successor, _) = db
        .find_or_create_by_auth_profile(&farcaster_snapshot(32, "new"), now)
        .await
        .unwrap();
    let signer = |user_id| NeynarSigner {
        id: Uuid::new_v4(),
        user_id,
        signer_uuid: "released-signer".to_owned(),
        public_key: "0xabc".to_owned(),
        fid: Some(31),
        status: SignerStatus::Approved,
        approval_url: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    db.upsert_signer(&signer(former.id)).await.unwrap().unwrap();
    assert!(db.soft_delete_user(former.id, now).await.unwrap());
    assert!(db.list_signers(former.id).await.unwrap().is_empty());

    let claimed = db.upsert_signer(&signer(successor.id)).await.unwrap().unwrap();
    assert_eq!(claimed.user_id, successor.id);
    assert!(claimed.deleted_at.is_none());
    assert_eq!(db.list_signers(successor.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_post_keyset_pagination() {
    let db = create_test_database().await;
    let user = create_test_user(&db, 3).await;
    let base = Utc::now() - Duration::hours(1);

    let mut ids = Vec::new();
    for minute in 0..5 {
        let created = base + Duration::minutes(minute);
        let post = Post {
            id: Uuid::new_v4(),
            user_id: user.id,
            content: format!("post {minute}"),
            media_urls: Vec::new(),
            status: PostStatus::Draft,
            published_at: None,
            created_at: created,
            updated_at: created,
            deleted_at: None,
            platforms: Vec::new(),
        };
        db.create_post(&post).await.unwrap();
        ids.push(post.id);
    }
    ids.reverse();

    let mut seen = Vec::new();
    let mut params = PaginationParams::new(None, Some(2));
    loop {
        let page = db.list_posts(user.id, None, false, &params).await.unwrap();
        assert!(page.items.len() <= 2);
        seen.extend(page.items.iter().map(|p| p.id));
        if !page.has_more {
            assert!(page.next_cursor.is_none());
            break;
        }
        params = PaginationParams::new(page.next_cursor.clone(), Some(2));
    }
    assert_eq!(seen, ids);

    // Deleted posts only appear in history
    assert!(db.soft_delete_post(user.id, ids[0], Utc::now()).await.unwrap());
    let active = db
        .list_posts(user.id, None, false, &PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(active.count, 4);
    let history = db
        .list_posts(user.id, None, true, &PaginationParams::default())
        .await
        .unwrap();
    assert_eq!(history.count, 5);
    assert!(history.items[0].deleted_at.is_some());
}

#[tokio::test]
async fn test_file_database_survives_reconnect() {
    let temp_dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", temp_dir.path().join("nora.db").display());
    let entry = WaitlistEntry {
        id: Uuid::new_v4(),
        email: "persist@example.com".to_owned(),
        source: None,
        referral_code: None,
        user_id: None,
        created_at: Utc::now(),
    };

    {
        let db = Database::new(&url).await.unwrap();
        let (_, created) = db.join_waitlist(&entry).await.unwrap();
        assert!(created);
        db.pool().close().await;
    }

    // Migrations are idempotent and the row is still there
    let db = Database::new(&url).await.unwrap();
    assert_eq!(db.count_waitlist_entries().await.unwrap(), 1);
    let (existing, created) = db.join_waitlist(&entry).await.unwrap();
    assert!(!created);
    assert_eq!(existing.id, entry.id);
}
