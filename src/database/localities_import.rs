//! Loading a locality directory dump into the `locality` table.
//!
//! Dumps contain "community" pseudo-units between districts and settlements.
//! They are dropped and their children re-parented to the community's parent, so
//! a settlement's parent is its district and the grandparent its region.

use super::models::LocalityKind;
use anyhow::Context;
use serde::Deserialize;
use sqlx::PgPool;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalizedName {
    #[serde(default)]
    pub uk: String,
    #[serde(default)]
    pub en: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DumpEntry {
    pub id: i32,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: LocalizedName,
    #[serde(default)]
    pub public_name: LocalizedName,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub parent_id: Option<i32>,
}

impl DumpEntry {
    fn is_community(&self) -> bool {
        self.public_name.en.to_lowercase().contains("community")
    }
}

/// A row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRow {
    pub id: i32,
    pub kind: LocalityKind,
    pub name_ua: String,
    pub name_en: String,
    pub public_name_ua: String,
    pub public_name_en: String,
    pub lng: Option<f64>,
    pub lat: Option<f64>,
    pub parent_id: Option<i32>,
}

pub fn parse_dump(json: &str) -> anyhow::Result<Vec<DumpEntry>> {
    serde_json::from_str(json).context("parse locality dump")
}

/// Drops community units, re-parents their children, and converts the rest.
/// Entries with an unknown type are skipped.
pub fn flatten_communities(entries: Vec<DumpEntry>) -> Vec<ImportRow> {
    let communities: HashMap<i32, Option<i32>> = entries
        .iter()
        .filter(|e| e.is_community())
        .map(|e| (e.id, e.parent_id.filter(|p| *p != 0)))
        .collect();

    entries
        .into_iter()
        .filter(|e| !e.is_community())
        .filter_map(|e| {
            let Some(kind) = LocalityKind::from_code(&e.kind) else {
                tracing::warn!(target: "storage", id = e.id, kind = %e.kind, "skipping locality with unknown type");
                return None;
            };
            let mut parent_id = e.parent_id.filter(|p| *p != 0);
            if let Some(p) = parent_id
                && let Some(grandparent) = communities.get(&p)
            {
                parent_id = *grandparent;
            }
            Some(ImportRow {
                id: e.id,
                kind,
                name_ua: e.name.uk,
                name_en: e.name.en,
                public_name_ua: e.public_name.uk,
                public_name_en: e.public_name.en,
                lng: e.lng,
                lat: e.lat,
                parent_id,
            })
        })
        .collect()
}

/// Inserts all rows in one transaction; existing ids are overwritten.
pub async fn import(pool: &PgPool, rows: &[ImportRow]) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;
    for row in rows {
        let res = sqlx::query(
            "INSERT INTO locality (id, type, name_ua, name_en, public_name_ua, public_name_en, lng, lat, parent_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (id) DO UPDATE SET type = EXCLUDED.type, name_ua = EXCLUDED.name_ua, \
                name_en = EXCLUDED.name_en, public_name_ua = EXCLUDED.public_name_ua, \
                public_name_en = EXCLUDED.public_name_en, lng = EXCLUDED.lng, lat = EXCLUDED.lat, \
                parent_id = EXCLUDED.parent_id",
        )
        .bind(row.id)
        .bind(row.kind)
        .bind(&row.name_ua)
        .bind(&row.name_en)
        .bind(&row.public_name_ua)
        .bind(&row.public_name_en)
        .bind(row.lng)
        .bind(row.lat)
        .bind(row.parent_id)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert locality {}", row.id))?;
        inserted += res.rows_affected();
    }
    tx.commit().await?;
    Ok(inserted)
}
