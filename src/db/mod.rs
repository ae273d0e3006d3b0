//! Database layer.
//!
//! [`UserCollection`] is the small document-store contract the rest of the
//! crate relies on; [`FirestoreDb`] and [`MemoryDb`] implement it and
//! [`UserDirectory`] wraps it with user-shaped operations.

pub mod directory;
pub mod firestore;
pub mod memory;

pub use directory::UserDirectory;
pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{User, UserUpdate};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
}

/// Filter on the `_id` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdFilter {
    All,
    Eq(String),
    In(Vec<String>),
}

impl IdFilter {
    pub fn matches(&self, id: &str) -> bool {
        match self {
            IdFilter::All => true,
            IdFilter::Eq(want) => want == id,
            IdFilter::In(ids) => ids.iter().any(|want| want == id),
        }
    }
}

/// Operations on the `users` collection.
///
/// `find` returns documents ordered by `_id` so that skip/limit pagination is
/// stable.
#[async_trait]
pub trait UserCollection: Send + Sync {
    async fn find_one(&self, filter: &IdFilter) -> Result<Option<User>, AppError>;

    async fn insert_one(&self, user: &User) -> Result<(), AppError>;

    async fn insert_many(&self, users: &[User]) -> Result<(), AppError>;

    /// `$set` the given fields on the first matching document.
    async fn update_one(&self, filter: &IdFilter, set: &UserUpdate) -> Result<(), AppError>;

    async fn count_documents(&self, filter: &IdFilter) -> Result<u64, AppError>;

    async fn find(&self, filter: &IdFilter, skip: u64, limit: u64)
        -> Result<Vec<User>, AppError>;
}
