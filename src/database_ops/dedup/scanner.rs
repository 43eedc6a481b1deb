use chrono::Utc;
use serde::Serialize;
use sqlx::Row;
use tracing::{info, instrument, warn};

use crate::database_ops::db::Db;
use crate::normalization::NameNormalizer;

use super::DedupError;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScanReport {
    /// Devices whose normalized name was computed and persisted this run.
    pub backfilled: u64,
    /// Groups sharing (normalized_name, device_type) with two or more members.
    pub groups_found: u64,
    /// Devices newly promoted to `potential` this run.
    pub devices_marked: u64,
}

/// Full-table duplicate scan.
///
/// Deliberately not one enclosing transaction: the backfill loop tolerates
/// partial progress and converges on rerun, and each qualifying group is
/// marked with its own statement. Rerunning against unchanged data reports
/// `devices_marked = 0`.
#[instrument(skip(db, normalizer))]
pub async fn scan_for_duplicates(
    db: &Db,
    normalizer: &dyn NameNormalizer,
) -> Result<ScanReport, DedupError> {
    let mut report = ScanReport::default();

    // Phase 1: backfill missing normalized names, one row at a time. A row
    // that fails is logged and picked up again by the next scan.
    let rows = sqlx::query(
        "SELECT id, name FROM devices WHERE normalized_name IS NULL OR normalized_name = ''",
    )
    .fetch_all(&db.pool)
    .await?;
    for row in rows {
        let id: i64 = row.get("id");
        let name: String = row.get("name");
        let normalized = normalizer.normalize(&name);
        let res = sqlx::query("UPDATE devices SET normalized_name = ?, updated_at = ? WHERE id = ?")
            .bind(&normalized)
            .bind(Utc::now())
            .bind(id)
            .execute(&db.pool)
            .await;
        match res {
            Ok(_) => report.backfilled += 1,
            Err(err) => {
                warn!(device_id = id, error = %err, "normalized-name backfill failed; retried on next scan")
            }
        }
    }

    // Phase 2: group by the comparison key.
    let groups = sqlx::query(
        "SELECT normalized_name, device_type, COUNT(*) AS members FROM devices \
         WHERE normalized_name IS NOT NULL AND normalized_name != '' \
         GROUP BY normalized_name, device_type HAVING COUNT(*) >= 2",
    )
    .fetch_all(&db.pool)
    .await?;
    report.groups_found = groups.len() as u64;

    // Phase 3: promote group members that are still `unique`. Confirmed
    // duplicates are never demoted, and re-marking `potential` is a no-op.
    for row in groups {
        let normalized: String = row.get("normalized_name");
        let device_type: String = row.get("device_type");
        let marked = sqlx::query(
            "UPDATE devices SET duplicate_status = 'potential', updated_at = ? \
             WHERE normalized_name = ? AND device_type = ? AND duplicate_status = 'unique'",
        )
        .bind(Utc::now())
        .bind(&normalized)
        .bind(&device_type)
        .execute(&db.pool)
        .await?;
        report.devices_marked += marked.rows_affected();
    }

    info!(
        backfilled = report.backfilled,
        groups = report.groups_found,
        marked = report.devices_marked,
        "duplicate scan complete"
    );
    Ok(report)
}
