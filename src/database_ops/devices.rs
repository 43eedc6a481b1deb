use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::dedup::DedupError;

/// Column list shared by every query that maps into a [`Device`].
pub(crate) const DEVICE_COLUMNS: &str =
    "id, name, device_type, normalized_name, duplicate_status, duplicate_of_id, created_at, updated_at";

/// Where a device sits in the duplicate lifecycle.
///
/// `unique` is the ingestion default, `potential` is scanner-suggested and
/// human-reversible, `duplicate` is terminal for the losing side of a merge
/// (or a manual flag) and must always carry `duplicate_of_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStatus {
    Unique,
    Potential,
    Duplicate,
}

impl DuplicateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicateStatus::Unique => "unique",
            DuplicateStatus::Potential => "potential",
            DuplicateStatus::Duplicate => "duplicate",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "unique" => Some(DuplicateStatus::Unique),
            "potential" => Some(DuplicateStatus::Potential),
            "duplicate" => Some(DuplicateStatus::Duplicate),
            _ => None,
        }
    }
}

impl std::fmt::Display for DuplicateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: i64,
    pub name: String,
    pub device_type: String,
    pub normalized_name: Option<String>,
    pub duplicate_status: DuplicateStatus,
    pub duplicate_of_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) fn device_from_row(row: &SqliteRow) -> Result<Device, sqlx::Error> {
    let status_raw: String = row.try_get("duplicate_status")?;
    let duplicate_status = DuplicateStatus::parse(&status_raw).ok_or_else(|| {
        sqlx::Error::Decode(format!("unknown duplicate_status '{status_raw}'").into())
    })?;
    Ok(Device {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        device_type: row.try_get("device_type")?,
        normalized_name: row.try_get("normalized_name")?,
        duplicate_status,
        duplicate_of_id: row.try_get("duplicate_of_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Fetch one device or fail with `NotFound`. Generic over the executor so
/// the merge transaction can re-read through its own snapshot.
pub async fn fetch_device<'e, E>(executor: E, id: i64) -> Result<Device, DedupError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let sql = format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?");
    let row = sqlx::query(&sql).bind(id).fetch_optional(executor).await?;
    match row {
        Some(row) => Ok(device_from_row(&row)?),
        None => Err(DedupError::NotFound(id)),
    }
}
