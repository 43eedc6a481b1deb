use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use tracing::instrument;

use crate::database_ops::db::Db;
use crate::database_ops::devices::{device_from_row, fetch_device, Device, DEVICE_COLUMNS};
use crate::normalization::NameNormalizer;

use super::DedupError;

/// Filter over the duplicate-status field for the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Potential,
    Duplicate,
    AllNonUnique,
}

impl StatusFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "potential" => Some(StatusFilter::Potential),
            "duplicate" => Some(StatusFilter::Duplicate),
            "all_non_unique" => Some(StatusFilter::AllNonUnique),
            _ => None,
        }
    }

    fn where_clause(&self) -> &'static str {
        match self {
            StatusFilter::Potential => "d.duplicate_status = 'potential'",
            StatusFilter::Duplicate => "d.duplicate_status = 'duplicate'",
            StatusFilter::AllNonUnique => "d.duplicate_status != 'unique'",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusEntry {
    #[serde(flatten)]
    pub device: Device,
    /// Display name of the canonical device, present for confirmed duplicates.
    pub duplicate_of_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusPage {
    pub devices: Vec<StatusEntry>,
    pub next_cursor: Option<String>,
}

/// Cursor-paginated listing by duplicate status, ordered by id. The cursor
/// is opaque to callers; internally it is the last id of the previous page.
#[instrument(skip(db))]
pub async fn devices_by_duplicate_status(
    db: &Db,
    filter: StatusFilter,
    limit: i64,
    cursor: Option<&str>,
) -> Result<StatusPage, DedupError> {
    let limit = limit.clamp(1, 200);
    let after: i64 = match cursor {
        Some(raw) => raw
            .parse()
            .map_err(|_| DedupError::Validation(format!("invalid cursor '{raw}'")))?,
        None => 0,
    };

    // Fetch one extra row to learn whether another page exists.
    let sql = format!(
        "SELECT d.id, d.name, d.device_type, d.normalized_name, d.duplicate_status, \
                d.duplicate_of_id, d.created_at, d.updated_at, c.name AS duplicate_of_name \
         FROM devices d LEFT JOIN devices c ON c.id = d.duplicate_of_id \
         WHERE {} AND d.id > ? ORDER BY d.id LIMIT ?",
        filter.where_clause()
    );
    let rows = sqlx::query(&sql)
        .bind(after)
        .bind(limit + 1)
        .fetch_all(&db.pool)
        .await?;

    let has_more = rows.len() as i64 > limit;
    let mut devices = Vec::with_capacity(rows.len().min(limit as usize));
    for row in rows.iter().take(limit as usize) {
        devices.push(StatusEntry {
            device: device_from_row(row)?,
            duplicate_of_name: row.try_get::<Option<String>, _>("duplicate_of_name")?,
        });
    }
    let next_cursor = if has_more {
        devices.last().map(|entry| entry.device.id.to_string())
    } else {
        None
    };

    Ok(StatusPage {
        devices,
        next_cursor,
    })
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DuplicateStats {
    pub unique: i64,
    pub potential: i64,
    pub duplicate: i64,
}

#[instrument(skip(db))]
pub async fn duplicate_stats(db: &Db) -> Result<DuplicateStats, DedupError> {
    let rows = sqlx::query(
        "SELECT duplicate_status, COUNT(*) AS total FROM devices GROUP BY duplicate_status",
    )
    .fetch_all(&db.pool)
    .await?;

    let mut stats = DuplicateStats::default();
    for row in rows {
        let status: String = row.get("duplicate_status");
        let total: i64 = row.get("total");
        match status.as_str() {
            "unique" => stats.unique = total,
            "potential" => stats.potential = total,
            "duplicate" => stats.duplicate = total,
            _ => {}
        }
    }
    Ok(stats)
}

/// Listing entry enriched with the read-only conveniences the review UI
/// needs to compare candidates side by side.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateEntry {
    #[serde(flatten)]
    pub device: Device,
    pub has_profile: bool,
    pub latest_price: Option<i64>,
    pub price_updated_at: Option<DateTime<Utc>>,
    pub links_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateSet {
    pub current: CandidateEntry,
    pub candidates: Vec<CandidateEntry>,
}

/// Devices sharing the given device's (normalized name, type) key.
#[instrument(skip(db, normalizer))]
pub async fn duplicate_candidates(
    db: &Db,
    device_id: i64,
    normalizer: &dyn NameNormalizer,
) -> Result<CandidateSet, DedupError> {
    let device = fetch_device(&db.pool, device_id).await?;

    // Unscanned devices get a throwaway key; persisting it is the scan's job.
    let normalized = match device.normalized_name.as_deref() {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => normalizer.normalize(&device.name),
    };

    let sql = format!(
        "SELECT {DEVICE_COLUMNS} FROM devices \
         WHERE normalized_name = ? AND device_type = ? AND id != ? ORDER BY id"
    );
    let rows = sqlx::query(&sql)
        .bind(&normalized)
        .bind(&device.device_type)
        .bind(device_id)
        .fetch_all(&db.pool)
        .await?;

    let mut candidates = Vec::with_capacity(rows.len());
    for row in &rows {
        candidates.push(enrich(db, device_from_row(row)?).await?);
    }
    let current = enrich(db, device).await?;

    Ok(CandidateSet {
        current,
        candidates,
    })
}

async fn enrich(db: &Db, device: Device) -> Result<CandidateEntry, DedupError> {
    let has_profile: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM device_characteristics WHERE device_id = ?)",
    )
    .bind(device.id)
    .fetch_one(&db.pool)
    .await?;

    let links_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE device_id = ?")
        .bind(device.id)
        .fetch_one(&db.pool)
        .await?;

    let latest = sqlx::query(
        "SELECT price_minor, recorded_at FROM links \
         WHERE device_id = ? AND price_minor IS NOT NULL \
         ORDER BY recorded_at DESC, id DESC LIMIT 1",
    )
    .bind(device.id)
    .fetch_optional(&db.pool)
    .await?;

    let (latest_price, price_updated_at) = match latest {
        Some(row) => (
            row.try_get::<Option<i64>, _>("price_minor")?,
            Some(row.try_get::<DateTime<Utc>, _>("recorded_at")?),
        ),
        None => (None, None),
    };

    Ok(CandidateEntry {
        device,
        has_profile,
        latest_price,
        price_updated_at,
        links_count,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarMatches {
    pub matches: Vec<Device>,
    pub match_type: MatchType,
}

/// Candidate discovery by name: exact on the normalized key first, plain
/// case-insensitive substring on the display name as the fallback. The
/// fuzzy pass only seeds discovery; it never drives a merge decision.
#[instrument(skip(db, normalizer))]
pub async fn find_similar_by_name(
    db: &Db,
    name: &str,
    device_type: Option<&str>,
    normalizer: &dyn NameNormalizer,
) -> Result<SimilarMatches, DedupError> {
    if name.trim().is_empty() {
        return Err(DedupError::Validation("name must not be empty".into()));
    }

    let normalized = normalizer.normalize(name);
    let mut exact_sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE normalized_name = ?");
    if device_type.is_some() {
        exact_sql.push_str(" AND device_type = ?");
    }
    exact_sql.push_str(" ORDER BY id LIMIT 50");

    let mut query = sqlx::query(&exact_sql).bind(&normalized);
    if let Some(t) = device_type {
        query = query.bind(t);
    }
    let rows = query.fetch_all(&db.pool).await?;
    if !rows.is_empty() {
        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            matches.push(device_from_row(row)?);
        }
        return Ok(SimilarMatches {
            matches,
            match_type: MatchType::Exact,
        });
    }

    let pattern = format!("%{}%", name.trim().to_lowercase());
    let mut fuzzy_sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE LOWER(name) LIKE ?");
    if device_type.is_some() {
        fuzzy_sql.push_str(" AND device_type = ?");
    }
    fuzzy_sql.push_str(" ORDER BY id LIMIT 50");

    let mut query = sqlx::query(&fuzzy_sql).bind(&pattern);
    if let Some(t) = device_type {
        query = query.bind(t);
    }
    let rows = query.fetch_all(&db.pool).await?;
    let mut matches = Vec::with_capacity(rows.len());
    for row in &rows {
        matches.push(device_from_row(row)?);
    }
    Ok(SimilarMatches {
        matches,
        match_type: MatchType::Fuzzy,
    })
}
