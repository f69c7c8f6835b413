//! Database functions for volunteer Help posts.
//! A Help is linked to one or more categories through `help_category`; deletion is soft.

use super::directory::REGION_NAME_SQL;
use super::models::{ExpiringHelp, Help, HelpView, NewHelp};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

fn help_view_query(extra_columns: &str, tail: &str) -> String {
    format!(
        "SELECT h.id, h.creator_id, \
            concat_ws(', ', l.public_name_ua, NULLIF({REGION_NAME_SQL}, '')) AS locality, \
            ARRAY(SELECT hc.category_id FROM help_category hc WHERE hc.help_id = h.id) AS category_ids, \
            h.description, h.created_at{extra_columns} \
         FROM help h \
            JOIN locality l ON l.id = h.locality_id \
            LEFT JOIN locality l2 ON l2.id = l.parent_id \
            LEFT JOIN locality l3 ON l3.id = l2.parent_id \
         {tail}"
    )
}

/// Inserts the Help and its category links in one transaction.
#[instrument(level = "debug", skip(pool))]
pub async fn create_help(pool: &PgPool, help: &NewHelp) -> Result<Help, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let (id, created_at): (Uuid, DateTime<Utc>) = sqlx::query_as(
        "INSERT INTO help (creator_id, locality_id, description) VALUES ($1, $2, $3) RETURNING id, created_at",
    )
    .bind(help.creator_id)
    .bind(help.locality_id)
    .bind(&help.description)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO help_category (help_id, category_id) SELECT $1, unnest($2::uuid[]) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(&help.category_ids)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(Help {
        id,
        creator_id: help.creator_id,
        category_ids: help.category_ids.clone(),
        locality_id: help.locality_id,
        description: help.description.clone(),
        created_at,
    })
}

/// Active Helps in the category at the locality. When the locality is not a city,
/// Helps posted anywhere in the same district are included.
#[instrument(level = "debug", skip(pool))]
pub async fn find_by_locality_category(
    pool: &PgPool,
    locality_id: i32,
    category_id: Uuid,
) -> Result<Vec<HelpView>, sqlx::Error> {
    let sql = help_view_query(
        "",
        "WHERE h.deleted_at IS NULL \
            AND EXISTS (SELECT 1 FROM help_category hc WHERE hc.help_id = h.id AND hc.category_id = $2) \
            AND (h.locality_id = $1 OR EXISTS ( \
                SELECT 1 FROM locality q JOIN locality d ON d.id = q.parent_id \
                WHERE q.id = $1 AND q.type <> 'CITY' AND d.type = 'DISTRICT' AND l.parent_id = d.id)) \
         ORDER BY h.created_at DESC",
    );
    sqlx::query_as::<_, HelpView>(&sql)
        .bind(locality_id)
        .bind(category_id)
        .fetch_all(pool)
        .await
}

#[instrument(level = "debug", skip(pool))]
pub async fn by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<HelpView>, sqlx::Error> {
    let sql = help_view_query(
        "",
        "WHERE h.creator_id = $1 AND h.deleted_at IS NULL ORDER BY h.created_at",
    );
    sqlx::query_as::<_, HelpView>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await
}

/// Returns `true` if an active Help owned by `owner` was soft-deleted.
#[instrument(level = "debug", skip(pool))]
pub async fn delete(pool: &PgPool, id: Uuid, owner: Uuid) -> Result<bool, sqlx::Error> {
    let res = sqlx::query(
        "UPDATE help SET deleted_at = now() WHERE id = $1 AND creator_id = $2 AND deleted_at IS NULL",
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
        "UPDATE help SET updated_at = now(), warned_at = NULL \
         WHERE id = $1 AND creator_id = $2 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(owner)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

#[instrument(level = "debug", skip(pool))]
pub async fn count_active_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT count(*) FROM help WHERE creator_id = $1 AND deleted_at IS NULL")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Active Helps with no activity since `before`, joined with the creator's chat.
#[instrument(level = "debug", skip(pool))]
pub async fn expired(pool: &PgPool, before: DateTime<Utc>) -> Result<Vec<ExpiringHelp>, sqlx::Error> {
    let sql = help_view_query(
        ", u.chat_id AS creator_chat_id, u.language AS creator_language, h.warned_at",
        "JOIN app_user u ON u.id = h.creator_id \
         WHERE h.deleted_at IS NULL AND coalesce(h.updated_at, h.created_at) < $1 \
         ORDER BY h.created_at",
    );
    sqlx::query_as::<_, ExpiringHelp>(&sql)
        .bind(before)
        .fetch_all(pool)
        .await
}

pub async fn mark_warned(pool: &PgPool, id: Uuid, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE help SET warned_at = $2 WHERE id = $1")
        .bind(id)
        .bind(at)
        .execute(pool)
        .await?;
    Ok(())
}
