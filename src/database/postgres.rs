//! `Storage` backed by Postgres. Each method delegates to the query function in
//! the matching domain module.

use super::init::DbPool;
use super::models::{
    Category, ExpiringHelp, ExpiringSubscription, Help, HelpView, LocalityCandidate, NewHelp,
    NewSubscription, NewUser, Subscription, SubscriptionMatch, SubscriptionView, User,
};
use super::{Storage, StorageResult, directory, helps, subscriptions, users};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
}

impl PgStorage {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn upsert_user(&self, user: NewUser) -> StorageResult<User> {
        Ok(users::upsert_user(&self.pool, &user).await?)
    }

    async fn list_categories(&self) -> StorageResult<Vec<Category>> {
        Ok(directory::list_categories(&self.pool).await?)
    }

    async fn find_localities(
        &self,
        query: &str,
        limit: i64,
    ) -> StorageResult<Vec<LocalityCandidate>> {
        let Some(query) = directory::normalize_query(query) else {
            return Ok(Vec::new());
        };
        Ok(directory::find_localities(&self.pool, &query, limit).await?)
    }

    async fn create_help(&self, help: NewHelp) -> StorageResult<Help> {
        Ok(helps::create_help(&self.pool, &help).await?)
    }

    async fn find_helps_by_locality_category(
        &self,
        locality_id: i32,
        category_id: Uuid,
    ) -> StorageResult<Vec<HelpView>> {
        Ok(helps::find_by_locality_category(&self.pool, locality_id, category_id).await?)
    }

    async fn helps_by_user(&self, user_id: Uuid) -> StorageResult<Vec<HelpView>> {
        Ok(helps::by_user(&self.pool, user_id).await?)
    }

    async fn delete_help(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        Ok(helps::delete(&self.pool, id, owner).await?)
    }

    async fn keep_help(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        Ok(helps::keep(&self.pool, id, owner).await?)
    }

    async fn count_active_helps_by_user(&self, user_id: Uuid) -> StorageResult<i64> {
        Ok(helps::count_active_by_user(&self.pool, user_id).await?)
    }

    async fn expired_helps(&self, before: DateTime<Utc>) -> StorageResult<Vec<ExpiringHelp>> {
        Ok(helps::expired(&self.pool, before).await?)
    }

    async fn mark_help_warned(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()> {
        Ok(helps::mark_warned(&self.pool, id, at).await?)
    }

    async fn create_subscription(&self, sub: NewSubscription) -> StorageResult<Subscription> {
        Ok(subscriptions::create(&self.pool, &sub).await?)
    }

    async fn subscriptions_by_user(&self, user_id: Uuid) -> StorageResult<Vec<SubscriptionView>> {
        Ok(subscriptions::by_user(&self.pool, user_id).await?)
    }

    async fn find_subscriptions_by_locality_categories(
        &self,
        locality_id: i32,
        category_ids: &[Uuid],
    ) -> StorageResult<Vec<SubscriptionMatch>> {
        Ok(subscriptions::find_by_locality_categories(&self.pool, locality_id, category_ids).await?)
    }

    async fn delete_subscription(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        Ok(subscriptions::delete(&self.pool, id, owner).await?)
    }

    async fn keep_subscription(&self, id: Uuid, owner: Uuid) -> StorageResult<bool> {
        Ok(subscriptions::keep(&self.pool, id, owner).await?)
    }

    async fn count_active_subscriptions_by_user(&self, user_id: Uuid) -> StorageResult<i64> {
        Ok(subscriptions::count_active_by_user(&self.pool, user_id).await?)
    }

    async fn expired_subscriptions(
        &self,
        before: DateTime<Utc>,
    ) -> StorageResult<Vec<ExpiringSubscription>> {
        Ok(subscriptions::expired(&self.pool, before).await?)
    }

    async fn mark_subscription_warned(&self, id: Uuid, at: DateTime<Utc>) -> StorageResult<()> {
        Ok(subscriptions::mark_warned(&self.pool, id, at).await?)
    }
}
