//! This module acts as a central hub for all storage-related logic.
//!
//! `Storage` is the contract the dialog engine, commands and background tasks
//! depend on. `PgStorage` implements it on top of the domain query modules
//! (`users`, `directory`, `helps`, `subscriptions`); `MemoryStorage` mirrors the
//! same semantics in process for tests and local runs.

pub mod directory;
pub mod helps;
pub mod init;
pub mod localities_import;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod subscriptions;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use models::{
    Category, ExpiringHelp, ExpiringSubscription, Help, HelpView, LocalityCandidate, NewHelp,
    NewSubscription, NewUser, Subscription, SubscriptionMatch, SubscriptionView, User,
};
use uuid::Uuid;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness constraint rejected the write (e.g. duplicate subscription).
    #[error("already exists")]
    AlreadyExists,
    #[error("not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(sqlx::Error),
    #[error("corrupt data: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e
            && db.is_unique_violation()
        {
            return StorageError::AlreadyExists;
        }
        StorageError::Database(e)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Creates the user on first contact, otherwise refreshes chat id and name.
    async fn upsert_user(&self, user: NewUser) -> StorageResult<User>;

    async fn list_categories(&self) -> StorageResult<Vec<Category>>;

    /// Fuzzy locality lookup: edit distance <= 1 on the normalized name, ordered by
    /// settlement-type preference, then distance.
    async fn find_localities(&self, query: &str, limit: i64)
    -> StorageResult<Vec<LocalityCandidate>>;

    async fn create_help(&self, help: NewHelp) -> StorageResult<Help>;

    /// Active Helps for a category at a locality. For non-city localities, Helps posted
    /// in localities of the same parent district are included.
    async fn find_helps_by_locality_category(
        &self,
        locality_id: i32,
        category_id: Uuid,
    ) -> StorageResult<Vec<HelpView>>;

    async fn helps_by_user(&self, user_id: Uuid) -> StorageResult<Vec<HelpView>>;

    /// Soft-deletes a Help owned by `owner`. Returns `false` if nothing matched.
    async fn delete_help(&self, id: Uuid, owner: Uuid) -> StorageResult<bool>;

    /// Marks a Help as recently active and clears any pending expiry warning.
    async fn keep_help(&self, id: Uuid, owner: Uuid) -> StorageResult<bool>;

    async fn count_active_helps_by_user(&self, user_id: Uuid) -> StorageResult<i64>;

    /// Active Helps whose last activity is older than `before`.
    async fn expired_helps(&self, before: DateTime<Utc>) -> StorageResult<Vec<ExpiringHelp>>;

    async fn mark_help_warned(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()>;

    /// Fails with `StorageError::AlreadyExists` if the same (creator, category, locality)
    /// subscription is already active.
    async fn create_subscription(&self, sub: NewSubscription) -> StorageResult<Subscription>;

    async fn subscriptions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<SubscriptionView>>;

    async fn find_subscriptions_by_locality_categories(
        &self,
        locality_id: i32,
        category_ids: &[Uuid],
    ) -> StorageResult<Vec<SubscriptionMatch>>;

    async fn delete_subscription(&self, id: Uuid, owner: Uuid) -> StorageResult<bool>;

    async fn keep_subscription(&self, id: Uuid, owner: Uuid) -> StorageResult<bool>;

    async fn count_active_subscriptions_by_user(&self, user_id: Uuid) -> StorageResult<i64>;

    async fn expired_subscriptions(
        &self,
        before: DateTime<Utc>,
    ) -> StorageResult<Vec<ExpiringSubscription>>;

    async fn mark_subscription_warned(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()>;
}
