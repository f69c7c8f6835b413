//! Database functions for chat users.

use super::models::{NewUser, User};
use sqlx::PgPool;
use tracing::instrument;

/// Creates the user on first contact. Returning users get their chat id and display
/// name refreshed; their stored language is left alone.
#[instrument(level = "debug", skip(pool))]
pub async fn upsert_user(pool: &PgPool, user: &NewUser) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "INSERT INTO app_user (tg_id, chat_id, name, language) VALUES ($1, $2, $3, $4) \
         ON CONFLICT (tg_id) DO UPDATE SET chat_id = EXCLUDED.chat_id, name = EXCLUDED.name, updated_at = now() \
         RETURNING id, tg_id, chat_id, name, language",
    )
    .bind(user.tg_id)
    .bind(user.chat_id)
    .bind(&user.name)
    .bind(user.language.code())
    .fetch_one(pool)
    .await
}
