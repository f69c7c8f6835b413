//! Read-only locality and category directory.
//!
//! The Postgres side relies on the `fuzzystrmatch` extension; the helpers below
//! give the in-memory store the same normalization, distance and ordering rules.

use super::models::{Category, LocalityCandidate};
use sqlx::PgPool;
use tracing::instrument;

// `levenshtein` in fuzzystrmatch rejects inputs longer than 255 characters.
const MAX_QUERY_CHARS: usize = 64;

pub const MAX_EDIT_DISTANCE: usize = 1;

/// Trims, collapses inner whitespace and title-cases each word ("  нові   ЯРИЛОВИЧІ" ->
/// "Нові Яриловичі"). Returns `None` for blank input.
pub fn normalize_query(input: &str) -> Option<String> {
    let words: Vec<String> = input
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        return None;
    }
    Some(words.join(" ").chars().take(MAX_QUERY_CHARS).collect())
}

/// Character-level edit distance, case-insensitive.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() {
        return b.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Drops administrative units and orders candidates by settlement-type preference,
/// then ascending distance, then name.
pub fn rank_candidates(mut candidates: Vec<LocalityCandidate>) -> Vec<LocalityCandidate> {
    candidates.retain(|c| c.kind.search_rank().is_some());
    candidates.sort_by(|a, b| {
        a.kind
            .search_rank()
            .cmp(&b.kind.search_rank())
            .then(a.distance.cmp(&b.distance))
            .then_with(|| a.name.cmp(&b.name))
            .then(a.id.cmp(&b.id))
    });
    candidates
}

// Region label: the nearest STATE among the first two ancestors.
pub(crate) const REGION_NAME_SQL: &str = "COALESCE(CASE WHEN l2.type = 'STATE' THEN l2.public_name_ua END, CASE WHEN l3.type = 'STATE' THEN l3.public_name_ua END, '')";

#[instrument(level = "debug", skip(pool))]
pub async fn find_localities(
    pool: &PgPool,
    query: &str,
    limit: i64,
) -> Result<Vec<LocalityCandidate>, sqlx::Error> {
    let sql = format!(
        r#"SELECT l.id, l.type AS kind, l.public_name_ua AS name, {REGION_NAME_SQL} AS region_name,
               l.parent_id, levenshtein(lower(l.name_ua), lower($1)) AS distance
        FROM locality l
            LEFT JOIN locality l2 ON l2.id = l.parent_id
            LEFT JOIN locality l3 ON l3.id = l2.parent_id
        WHERE l.type IN ('CITY', 'URBAN', 'SETTLEMENT', 'VILLAGE')
            AND levenshtein(lower(l.name_ua), lower($1)) <= $2
        ORDER BY l.type, distance, l.public_name_ua, l.id
        LIMIT $3"#
    );
    sqlx::query_as::<_, LocalityCandidate>(&sql)
        .bind(query)
        .bind(MAX_EDIT_DISTANCE as i32)
        .bind(limit)
        .fetch_all(pool)
        .await
}

#[instrument(level = "debug", skip(pool))]
pub async fn list_categories(pool: &PgPool) -> Result<Vec<Category>, sqlx::Error> {
    sqlx::query_as::<_, Category>(
        "SELECT id, name_ua, name_en FROM category ORDER BY sort_order, name_ua",
    )
    .fetch_all(pool)
    .await
}
