// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed `users` collection.
//!
//! Each user is one document whose document ID equals its `_id` field. The
//! `_id` is also stored as a regular field so set-membership filters and
//! ordering can use it.

use crate::db::{collections, IdFilter, UserCollection};
use crate::error::AppError;
use crate::models::{User, UserUpdate};
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use futures_util::{stream, StreamExt};
use serde::Deserialize;

const MAX_CONCURRENT_DB_OPS: usize = 50;
// Firestore caps `in` filters at 30 values.
const MAX_IN_VALUES: usize = 30;

/// Result row of a `count()` aggregation.
#[derive(Debug, Deserialize)]
struct UserCount {
    count: u64,
}

/// An `AlreadyExists` write becomes [`AppError::Conflict`].
fn write_error(e: FirestoreError) -> AppError {
    match e {
        FirestoreError::DataConflictError(err) => AppError::Conflict(err.to_string()),
        other => AppError::Database(other.to_string()),
    }
}

/// Distinct IDs in batches small enough for an `in` filter.
fn id_chunks(ids: &[String]) -> Vec<Vec<String>> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids.chunks(MAX_IN_VALUES).map(<[String]>::to_vec).collect()
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any bearer token; skip ADC lookup entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create an offline client. Every operation returns a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// The connected client, or a database error for an offline instance.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// All users matching a filter, ordered by `_id`.
    async fn query(&self, filter: &IdFilter) -> Result<Vec<User>, AppError> {
        let client = self.get_client()?;

        match filter {
            IdFilter::All => client
                .fluent()
                .select()
                .from(collections::USERS)
                .order_by([("_id", firestore::FirestoreQueryDirection::Ascending)])
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string())),
            IdFilter::Eq(id) => Ok(self.get_by_id(id).await?.into_iter().collect()),
            IdFilter::In(ids) => {
                let mut users = Vec::new();
                for chunk in id_chunks(ids) {
                    let mut found: Vec<User> = client
                        .fluent()
                        .select()
                        .from(collections::USERS)
                        .filter(move |q| q.field("_id").is_in(chunk.clone()))
                        .obj()
                        .query()
                        .await
                        .map_err(|e| AppError::Database(e.to_string()))?;
                    users.append(&mut found);
                }
                users.sort_by(|a, b| a.id.cmp(&b.id));
                Ok(users)
            }
        }
    }

    /// Server-side `count()` over all users, or over one batch of IDs.
    async fn count_where(&self, ids: Option<Vec<String>>) -> Result<u64, AppError> {
        let counts: Vec<UserCount> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| ids.clone().and_then(|ids| q.field("_id").is_in(ids)))
            .aggregate(|a| a.fields([a.field("count").count()]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(counts.first().map_or(0, |c| c.count))
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl UserCollection for FirestoreDb {
    async fn find_one(&self, filter: &IdFilter) -> Result<Option<User>, AppError> {
        match filter {
            IdFilter::Eq(id) => self.get_by_id(id).await,
            _ => Ok(self.query(filter).await?.into_iter().next()),
        }
    }

    async fn insert_one(&self, user: &User) -> Result<(), AppError> {
        let _: User = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(write_error)?;
        Ok(())
    }

    /// Writes run concurrently, at most `MAX_CONCURRENT_DB_OPS` at a time.
    async fn insert_many(&self, users: &[User]) -> Result<(), AppError> {
        stream::iter(users.to_vec())
            .map(|user: User| {
                let db = self.clone();
                async move { db.insert_one(&user).await }
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        Ok(())
    }

    async fn update_one(&self, filter: &IdFilter, set: &UserUpdate) -> Result<(), AppError> {
        if set.is_empty() {
            return Ok(());
        }

        let Some(existing) = self.find_one(filter).await? else {
            return Ok(());
        };

        let _: UserUpdate = self
            .get_client()?
            .fluent()
            .update()
            .fields(set.field_names())
            .in_col(collections::USERS)
            .document_id(&existing.id)
            .object(set)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(user_id = %existing.id, fields = ?set.field_names(), "Updated user");
        Ok(())
    }

    async fn count_documents(&self, filter: &IdFilter) -> Result<u64, AppError> {
        let chunks = match filter {
            IdFilter::All => return self.count_where(None).await,
            IdFilter::Eq(id) => return Ok(u64::from(self.get_by_id(id).await?.is_some())),
            IdFilter::In(ids) => id_chunks(ids),
        };

        let mut total = 0;
        for chunk in chunks {
            total += self.count_where(Some(chunk)).await?;
        }
        Ok(total)
    }

    async fn find(
        &self,
        filter: &IdFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<User>, AppError> {
        if let IdFilter::All = filter {
            let offset = u32::try_from(skip)
                .map_err(|_| AppError::BadRequest("Page offset too large".to_string()))?;
            let limit = u32::try_from(limit).unwrap_or(u32::MAX);

            return self
                .get_client()?
                .fluent()
                .select()
                .from(collections::USERS)
                .order_by([("_id", firestore::FirestoreQueryDirection::Ascending)])
                .offset(offset)
                .limit(limit)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()));
        }

        Ok(self
            .query(filter)
            .await?
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_client_reports_database_error() {
        let db = FirestoreDb::new_mock();

        let result = db.find_one(&IdFilter::Eq("1".to_string())).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let result = db.count_documents(&IdFilter::All).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_empty_update_is_noop() {
        let db = FirestoreDb::new_mock();
        db.update_one(&IdFilter::Eq("1".to_string()), &UserUpdate::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_offline_writes_report_database_error() {
        let db = FirestoreDb::new_mock();
        let set = UserUpdate {
            username: Some("renamed".to_string()),
            ..Default::default()
        };

        let result = db.update_one(&IdFilter::Eq("1".to_string()), &set).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let user = User {
            id: "1".to_string(),
            username: "aims".to_string(),
            discriminator: "0001".to_string(),
            avatar: None,
            latest_ip: "unknown".to_string(),
            permissions: crate::models::UserPermissions::DEFAULT,
            registered: "2026-01-01T00:00:00.000Z".to_string(),
            last_login_or_refresh: "2026-01-01T00:00:00.000Z".to_string(),
            posts: 0,
            comments: 0,
        };
        let result = db.insert_many(&[user]).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let result = db.count_documents(&IdFilter::In(vec!["1".to_string()])).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[test]
    fn test_already_exists_is_a_conflict() {
        use firestore::errors::{FirestoreDataConflictError, FirestoreErrorPublicGenericDetails};

        let err = FirestoreError::DataConflictError(FirestoreDataConflictError::new(
            FirestoreErrorPublicGenericDetails::new("AlreadyExists".to_string()),
            "document already exists".to_string(),
        ));

        assert!(matches!(write_error(err), AppError::Conflict(_)));
    }

    #[test]
    fn test_id_chunks_are_distinct_and_bounded() {
        let mut ids: Vec<String> = (0..70).map(|i| format!("{:03}", i)).collect();
        ids.extend(ids.clone());

        let chunks = id_chunks(&ids);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.len() <= MAX_IN_VALUES));
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), 70);
    }
}
