// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running.
//! Start the emulator and set FIRESTORE_EMULATOR_HOST before running.
//!
//! The emulator keeps data between tests, so every test uses fresh IDs.

use aims_backend::db::UserDirectory;
use aims_backend::models::{User, UserPermissions, UserUpdate};

mod common;
use common::{test_db, test_user};

/// Generate a unique user ID prefix for test isolation.
fn unique_prefix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("it-{}", nanos)
}

async fn directory() -> UserDirectory {
    UserDirectory::firestore(test_db().await)
}

#[tokio::test]
async fn test_user_insert_and_find() {
    require_emulator!();

    let directory = directory().await;
    let id = unique_prefix();

    assert!(directory.find_by_id(&id).await.unwrap().is_none());

    let user = User {
        avatar: Some("a_1234".to_string()),
        ..test_user(&id, UserPermissions::COMMENT)
    };
    directory.insert(&user).await.unwrap();

    let fetched = directory.find_by_id(&id).await.unwrap();
    assert_eq!(fetched, Some(user));

    println!("✓ User created and verified: id={}", id);
}

#[tokio::test]
async fn test_update_sets_only_given_fields() {
    require_emulator!();

    let directory = directory().await;
    let id = unique_prefix();
    let original = test_user(&id, UserPermissions::COMMENT | UserPermissions::UPLOAD);
    directory.insert(&original).await.unwrap();

    let set = UserUpdate {
        username: Some("renamed".to_string()),
        avatar: Some(None),
        last_login_or_refresh: Some("2026-02-01T00:00:00.000Z".to_string()),
        ..Default::default()
    };
    directory.update_fields(&id, &set).await.unwrap();

    let fetched = directory.find_by_id(&id).await.unwrap().unwrap();
    assert_eq!(fetched.username, "renamed");
    assert_eq!(fetched.avatar, None);
    assert_eq!(fetched.last_login_or_refresh, "2026-02-01T00:00:00.000Z");
    assert_eq!(fetched.permissions, original.permissions);
    assert_eq!(fetched.registered, original.registered);
    assert_eq!(fetched.posts, original.posts);

    println!("✓ Partial update verified: id={}", id);
}

#[tokio::test]
async fn test_count_and_page_with_ids() {
    require_emulator!();

    let directory = directory().await;
    let prefix = unique_prefix();
    let ids: Vec<String> = (0..5).map(|i| format!("{}-{}", prefix, i)).collect();
    let users: Vec<User> = ids
        .iter()
        .map(|id| test_user(id, UserPermissions::DEFAULT))
        .collect();
    directory.insert_many(&users).await.unwrap();

    let subset = &ids[1..4];
    assert_eq!(directory.count(Some(subset)).await.unwrap(), 3);

    let page: Vec<String> = directory
        .page(Some(subset), 1, 1)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(page, vec![ids[2].clone()]);

    println!("✓ Filtered pagination verified: prefix={}", prefix);
}
