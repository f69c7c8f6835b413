//! Database functions for seeker subscriptions.
//! Only one active subscription may exist per (creator, category, locality); the
//! partial unique index `subscription_active_uniq` enforces it.

use super::directory::REGION_NAME_SQL;
use super::models::{
    ExpiringSubscription, NewSubscription, Subscription, SubscriptionMatch, SubscriptionView,
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

fn subscription_view_query(extra_columns: &str, tail: &str) -> String {
    format!(
        "SELECT s.id, s.creator_id, s.category_id, \
            concat_ws(', ', l.public_name_ua, NULLIF({REGION_NAME_SQL}, '')) AS locality, \
            s.created_at{extra_columns} \
         FROM subscription s \
            JOIN locality l ON l.id = s.locality_id \
            LEFT JOIN locality l2 ON l2.id = l.parent_id \
            LEFT JOIN locality l3 ON l3.id = l2.parent_id \
         {tail}"
    )
}

/// A duplicate active subscription surfaces as a unique violation.
#[instrument(level = "debug", skip(pool))]
pub async fn create(pool: &PgPool, sub: &NewSubscription) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        "INSERT INTO subscription (creator_id, category_id, locality_id) VALUES ($1, $2, $3) \
         RETURNING id, creator_id, category_id, locality_id, created_at",
    )
    .bind(sub.creator_id)
    .bind(sub.category_id)
    .bind(sub.locality_id)
    .fetch_one(pool)
    .await
}

#[instrument(level = "debug", skip(pool))]
pub async fn by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<SubscriptionView>, sqlx::Error> {
    let sql = subscription_view_query(
        "",
        "WHERE s.creator_id = $1 AND s.deleted_at IS NULL ORDER BY s.created_at",
    );
    sqlx::query_as::<_, SubscriptionView>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Subscribers at exactly this locality for any of the given categories.
#[instrument(level = "debug", skip(pool))]
pub async fn find_by_locality_categories(
    pool: &PgPool,
    locality_id: i32,
    category_ids: &[Uuid],
) -> Result<Vec<SubscriptionMatch>, sqlx::Error> {
    sqlx::query_as::<_, SubscriptionMatch>(
        "SELECT s.id AS subscription_id, s.creator_id, u.chat_id, u.language, s.category_id \
         FROM subscription s JOIN app_user u ON u.id = s.creator_id \
         WHERE s.deleted_at IS NULL AND s.locality_id = $1 AND s.category_id = ANY($2) \
         ORDER BY s.created_at",
    )
    .bind(locality_id)
    .bind(category_ids)
    .fetch_all(pool)
    .await
}

#[instrument(level = "debug", skip(pool))]
pub async fn delete(pool: &PgPool, id: Uuid, owner: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE subscription SET deleted_at = now() WHERE id = $1 AND creator_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

#[instrument(level = "debug", skip(pool))]
pub async fn keep(pool: &PgPool, id: Uuid, owner: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE subscription SET updated_at = now(), warned_at = NULL \
         WHERE id = $1 AND creator_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

pub async fn count_active_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT count(*) FROM subscription WHERE creator_id = $1 AND deleted_at IS NULL",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}

#[instrument(level = "debug", skip(pool))]
pub async fn expired(
    pool: &PgPool,
    before: DateTime<Utc>,
) -> Result<Vec<ExpiringSubscription>, sqlx::Error> {
    let sql = subscription_view_query(
        ", u.chat_id AS creator_chat_id, u.language AS creator_language, s.warned_at",
        "JOIN app_user u ON u.id = s.creator_id \
         WHERE s.deleted_at IS NULL AND coalesce(s.updated_at, s.created_at) < $1 \
         ORDER BY s.created_at",
    );
    sqlx::query_as::<_, ExpiringSubscription>(&sql)
        .bind(before)
        .fetch_all(pool)
        .await
}

pub async fn mark_warned(pool: &PgPool, id: Uuid, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE subscription SET warned_at = $2 WHERE id = $1")
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}
