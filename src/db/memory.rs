// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process user store, used for local development and tests.

use crate::db::{IdFilter, UserCollection};
use crate::error::AppError;
use crate::models::{User, UserUpdate};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// User collection held in a concurrent map keyed by `_id`.
#[derive(Clone, Default)]
pub struct MemoryDb {
    users: Arc<DashMap<String, User>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, filter: &IdFilter) -> Vec<User> {
        let mut users: Vec<User> = match filter {
            IdFilter::Eq(id) => self.users.get(id).map(|u| u.clone()).into_iter().collect(),
            _ => self
                .users
                .iter()
                .filter(|entry| filter.matches(entry.key()))
                .map(|entry| entry.value().clone())
                .collect(),
        };
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }
}

#[async_trait]
impl UserCollection for MemoryDb {
    async fn find_one(&self, filter: &IdFilter) -> Result<Option<User>, AppError> {
        Ok(self.matching(filter).into_iter().next())
    }

    async fn insert_one(&self, user: &User) -> Result<(), AppError> {
        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "user {} already exists",
                user.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn insert_many(&self, users: &[User]) -> Result<(), AppError> {
        for user in users {
            self.insert_one(user).await?;
        }
        Ok(())
    }

    async fn update_one(&self, filter: &IdFilter, set: &UserUpdate) -> Result<(), AppError> {
        let Some(id) = self.matching(filter).into_iter().next().map(|u| u.id) else {
            return Ok(());
        };

        if let Some(mut user) = self.users.get_mut(&id) {
            user.apply(set);
        }
        Ok(())
    }

    async fn count_documents(&self, filter: &IdFilter) -> Result<u64, AppError> {
        Ok(self.matching(filter).len() as u64)
    }

    async fn find(
        &self,
        filter: &IdFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<User>, AppError> {
        Ok(self
            .matching(filter)
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserPermissions;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            username: format!("user{}", id),
            discriminator: "0000".to_string(),
            avatar: None,
            latest_ip: "127.0.0.1".to_string(),
            permissions: UserPermissions::DEFAULT,
            registered: "2026-01-01T00:00:00.000Z".to_string(),
            last_login_or_refresh: "2026-01-01T00:00:00.000Z".to_string(),
            posts: 0,
            comments: 0,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = MemoryDb::new();
        db.insert_one(&user("1")).await.unwrap();

        let found = db.find_one(&IdFilter::Eq("1".to_string())).await.unwrap();
        assert_eq!(found, Some(user("1")));
        assert!(db
            .find_one(&IdFilter::Eq("2".to_string()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let db = MemoryDb::new();
        db.insert_one(&user("1")).await.unwrap();

        assert!(matches!(
            db.insert_one(&user("1")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_sets_only_given_fields() {
        let db = MemoryDb::new();
        db.insert_one(&user("1")).await.unwrap();

        let set = UserUpdate {
            permissions: Some(UserPermissions::AUDIT),
            ..Default::default()
        };
        db.update_one(&IdFilter::Eq("1".to_string()), &set)
            .await
            .unwrap();

        let updated = db
            .find_one(&IdFilter::Eq("1".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.permissions, UserPermissions::AUDIT);
        assert_eq!(updated.username, "user1");
    }

    #[tokio::test]
    async fn test_find_paginates_in_id_order() {
        let db = MemoryDb::new();
        db.insert_many(&[user("3"), user("1"), user("2"), user("4")])
            .await
            .unwrap();

        let page: Vec<String> = db
            .find(&IdFilter::All, 1, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(page, vec!["2", "3"]);

        let subset = IdFilter::In(vec!["4".to_string(), "1".to_string(), "9".to_string()]);
        assert_eq!(db.count_documents(&subset).await.unwrap(), 2);
        assert_eq!(db.count_documents(&IdFilter::All).await.unwrap(), 4);
    }
}
