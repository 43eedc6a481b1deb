use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

use crate::database_ops::db::Db;
use crate::database_ops::devices::Device;

use super::{load_merge_pair, DedupError};

/// Rows the duplicate device currently owns, per relation.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RelationCounts {
    pub links: i64,
    pub pros_cons: i64,
    pub configs: i64,
    pub device_to_ratings: i64,
    pub rating_positions: i64,
}

/// Identifying fields of a characteristics profile, for caller display.
#[derive(Debug, Clone, Serialize)]
pub struct CharacteristicsSummary {
    pub id: i64,
    pub device_id: i64,
    pub chipset: Option<String>,
    pub ram_gb: Option<i64>,
    pub battery_mah: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MergePreview {
    pub canonical: Device,
    pub duplicate: Device,
    pub to_transfer: RelationCounts,
    /// Ratings in which both devices already hold a position.
    pub rating_conflicts: Vec<i64>,
    pub has_characteristics_conflict: bool,
    pub canonical_characteristics: Option<CharacteristicsSummary>,
    pub duplicate_characteristics: Option<CharacteristicsSummary>,
}

/// Read-only diff between the two merge candidates. Same failure modes as
/// the merge itself, safe to call any number of times.
#[instrument(skip(db))]
pub async fn merge_preview(
    db: &Db,
    canonical_id: i64,
    duplicate_id: i64,
) -> Result<MergePreview, DedupError> {
    let (canonical, duplicate) = load_merge_pair(db, canonical_id, duplicate_id).await?;

    let to_transfer = relation_counts(&db.pool, duplicate_id).await?;

    let rating_conflicts: Vec<i64> = sqlx::query_scalar(
        "SELECT a.rating_id FROM rating_positions a \
         JOIN rating_positions b ON b.rating_id = a.rating_id \
         WHERE a.device_id = ? AND b.device_id = ? \
         ORDER BY a.rating_id",
    )
    .bind(duplicate_id)
    .bind(canonical_id)
    .fetch_all(&db.pool)
    .await?;

    let canonical_characteristics = fetch_characteristics(&db.pool, canonical_id).await?;
    let duplicate_characteristics = fetch_characteristics(&db.pool, duplicate_id).await?;
    let has_characteristics_conflict =
        canonical_characteristics.is_some() && duplicate_characteristics.is_some();

    Ok(MergePreview {
        canonical,
        duplicate,
        to_transfer,
        rating_conflicts,
        has_characteristics_conflict,
        canonical_characteristics,
        duplicate_characteristics,
    })
}

async fn count_owned(pool: &SqlitePool, table: &str, device_id: i64) -> Result<i64, DedupError> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE device_id = ?");
    Ok(sqlx::query_scalar(&sql).bind(device_id).fetch_one(pool).await?)
}

pub(crate) async fn relation_counts(
    pool: &SqlitePool,
    device_id: i64,
) -> Result<RelationCounts, DedupError> {
    Ok(RelationCounts {
        links: count_owned(pool, "links", device_id).await?,
        pros_cons: count_owned(pool, "pros_cons", device_id).await?,
        configs: count_owned(pool, "config_to_device", device_id).await?,
        device_to_ratings: count_owned(pool, "device_to_rating", device_id).await?,
        rating_positions: count_owned(pool, "rating_positions", device_id).await?,
    })
}

/// Latest characteristics profile for a device, if any. A device holds at
/// most one current profile in practice.
pub(crate) async fn fetch_characteristics(
    pool: &SqlitePool,
    device_id: i64,
) -> Result<Option<CharacteristicsSummary>, DedupError> {
    let row = sqlx::query(
        "SELECT id, device_id, chipset, ram_gb, battery_mah, created_at \
         FROM device_characteristics WHERE device_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(device_id)
    .fetch_optional(pool)
    .await?;
    Ok(match row {
        Some(row) => Some(CharacteristicsSummary {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            chipset: row.try_get("chipset")?,
            ram_gb: row.try_get("ram_gb")?,
            battery_mah: row.try_get("battery_mah")?,
            created_at: row.try_get("created_at")?,
        }),
        None => None,
    })
}
