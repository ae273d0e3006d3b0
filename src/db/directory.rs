// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-shaped operations over whichever collection backs the server.

use std::sync::Arc;

use crate::db::{FirestoreDb, IdFilter, MemoryDb, UserCollection};
use crate::error::AppError;
use crate::models::{User, UserUpdate};

/// Handle to the `users` collection. Cheap to clone.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserCollection>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserCollection>) -> Self {
        Self { users }
    }

    pub fn memory(db: MemoryDb) -> Self {
        Self::new(Arc::new(db))
    }

    pub fn firestore(db: FirestoreDb) -> Self {
        Self::new(Arc::new(db))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.users.find_one(&IdFilter::Eq(id.to_string())).await
    }

    pub async fn insert(&self, user: &User) -> Result<(), AppError> {
        self.users.insert_one(user).await
    }

    pub async fn insert_many(&self, users: &[User]) -> Result<(), AppError> {
        self.users.insert_many(users).await
    }

    /// Overwrite only the fields present in `set`.
    pub async fn update_fields(&self, id: &str, set: &UserUpdate) -> Result<(), AppError> {
        self.users
            .update_one(&IdFilter::Eq(id.to_string()), set)
            .await
    }

    /// Number of users, optionally restricted to a set of IDs.
    pub async fn count(&self, ids: Option<&[String]>) -> Result<u64, AppError> {
        self.users.count_documents(&id_filter(ids)).await
    }

    /// One page of users in ID order.
    pub async fn page(
        &self,
        ids: Option<&[String]>,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<User>, AppError> {
        self.users.find(&id_filter(ids), skip, limit).await
    }
}

fn id_filter(ids: Option<&[String]>) -> IdFilter {
    match ids {
        Some(ids) => IdFilter::In(ids.to_vec()),
        None => IdFilter::All,
    }
}
