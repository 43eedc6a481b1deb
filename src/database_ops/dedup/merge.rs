use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{info, instrument};

use crate::database_ops::db::Db;

use super::{load_merge_pair, CharacteristicsAction, DedupError};

/// Picks the surviving position value when both devices hold a slot in the
/// same rating. Kept injectable because "better" is a display convention,
/// not a law of the schema.
pub type PositionPolicy = fn(canonical: i64, duplicate: i64) -> i64;

/// Default policy: the numerically lower slot is the better rank and wins.
pub fn lower_position_wins(canonical: i64, duplicate: i64) -> i64 {
    canonical.min(duplicate)
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MergeRequest {
    pub canonical_id: i64,
    pub duplicate_id: i64,
    #[serde(default)]
    pub characteristics_action: CharacteristicsAction,
    #[serde(default)]
    pub delete_after_merge: bool,
}

/// Rows actually transferred onto the canonical device. For the
/// conflict-bearing relations this counts every row the duplicate owned
/// that was folded in, whether moved or resolved against an existing row.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TransferCounts {
    pub links: u64,
    pub pros_cons: u64,
    pub configs: u64,
    pub device_to_ratings: u64,
    pub rating_positions: u64,
    pub characteristics: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct MergeOutcome {
    pub transferred: TransferCounts,
    pub duplicate_deleted: bool,
}

/// Folds the duplicate device's entire relational graph into the canonical
/// device inside a single transaction, with [`lower_position_wins`] as the
/// rating-position tie-break.
#[instrument(skip(db))]
pub async fn merge_duplicate(db: &Db, req: MergeRequest) -> Result<MergeOutcome, DedupError> {
    merge_duplicate_with_policy(db, req, lower_position_wins).await
}

pub async fn merge_duplicate_with_policy(
    db: &Db,
    req: MergeRequest,
    policy: PositionPolicy,
) -> Result<MergeOutcome, DedupError> {
    // keep_both leaves the profile attached to the duplicate device; hard
    // deleting that device at the same time would strand the profile and
    // its children behind a dead id.
    if req.characteristics_action == CharacteristicsAction::KeepBoth && req.delete_after_merge {
        return Err(DedupError::Validation(
            "characteristics_action=keep_both cannot be combined with delete_after_merge".into(),
        ));
    }
    load_merge_pair(db, req.canonical_id, req.duplicate_id).await?;

    let mut tx = db.pool.begin().await?;

    // Re-check the target guard through the transaction's own snapshot: a
    // competing merge may have flagged the canonical side since the read
    // above.
    let status: Option<String> =
        sqlx::query_scalar("SELECT duplicate_status FROM devices WHERE id = ?")
            .bind(req.canonical_id)
            .fetch_optional(&mut *tx)
            .await?;
    match status.as_deref() {
        None => return Err(DedupError::NotFound(req.canonical_id)),
        Some("duplicate") => {
            return Err(DedupError::Precondition(format!(
                "device {} is itself flagged duplicate; resolve that flag before merging into it",
                req.canonical_id
            )))
        }
        Some(_) => {}
    }

    let mut transferred = TransferCounts::default();

    // Steps 1-2: independent rows, plain reassignment, no conflict possible.
    transferred.links =
        reassign_owned(&mut tx, "links", req.canonical_id, req.duplicate_id).await?;
    transferred.pros_cons =
        reassign_owned(&mut tx, "pros_cons", req.canonical_id, req.duplicate_id).await?;

    // Steps 3-4: union-dedup of the two many-to-many relations.
    transferred.configs = merge_many_to_many(
        &mut tx,
        "config_to_device",
        "config_id",
        req.canonical_id,
        req.duplicate_id,
    )
    .await?;
    transferred.device_to_ratings = merge_many_to_many(
        &mut tx,
        "device_to_rating",
        "rating_id",
        req.canonical_id,
        req.duplicate_id,
    )
    .await?;

    // Step 5: rating positions, the slot-per-rating conflict.
    transferred.rating_positions =
        transfer_rating_positions(&mut tx, req.canonical_id, req.duplicate_id, policy).await?;

    // Step 6: characteristics profile, policy-driven. Independent of 1-5.
    transferred.characteristics = transfer_characteristics(
        &mut tx,
        req.canonical_id,
        req.duplicate_id,
        req.characteristics_action,
    )
    .await?;

    // Step 7: status flip, last, so an abort anywhere above never leaves a
    // half-merged pair observable.
    let now = Utc::now();
    sqlx::query(
        "UPDATE devices SET duplicate_status = 'duplicate', duplicate_of_id = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(req.canonical_id)
    .bind(now)
    .bind(req.duplicate_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query(
        "UPDATE devices SET duplicate_status = 'unique', duplicate_of_id = NULL, updated_at = ? \
         WHERE id = ?",
    )
    .bind(now)
    .bind(req.canonical_id)
    .execute(&mut *tx)
    .await?;
    // Devices already recorded as duplicates of the absorbed device are
    // repointed so no duplicate ever references another duplicate.
    sqlx::query(
        "UPDATE devices SET duplicate_of_id = ?, updated_at = ? \
         WHERE duplicate_status = 'duplicate' AND duplicate_of_id = ?",
    )
    .bind(req.canonical_id)
    .bind(now)
    .bind(req.duplicate_id)
    .execute(&mut *tx)
    .await?;

    // Step 8: optional hard delete of the now-empty duplicate row.
    let mut duplicate_deleted = false;
    if req.delete_after_merge {
        sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(req.duplicate_id)
            .execute(&mut *tx)
            .await?;
        duplicate_deleted = true;
    }

    tx.commit().await?;

    info!(
        canonical = req.canonical_id,
        duplicate = req.duplicate_id,
        ?transferred,
        duplicate_deleted,
        "merge committed"
    );
    Ok(MergeOutcome {
        transferred,
        duplicate_deleted,
    })
}

async fn reassign_owned(
    conn: &mut SqliteConnection,
    table: &str,
    canonical_id: i64,
    duplicate_id: i64,
) -> Result<u64, DedupError> {
    let sql = format!("UPDATE {table} SET device_id = ? WHERE device_id = ?");
    let done = sqlx::query(&sql)
        .bind(canonical_id)
        .bind(duplicate_id)
        .execute(&mut *conn)
        .await?;
    Ok(done.rows_affected())
}

/// Union-dedup for a two-column join table: read both sides, insert the
/// duplicate's rows the canonical side does not already hold, then drop all
/// of the duplicate's originals. Returns the number of rows inserted.
async fn merge_many_to_many(
    conn: &mut SqliteConnection,
    table: &str,
    other_column: &str,
    canonical_id: i64,
    duplicate_id: i64,
) -> Result<u64, DedupError> {
    let select = format!("SELECT {other_column} FROM {table} WHERE device_id = ?");
    let canonical_side: Vec<i64> = sqlx::query_scalar(&select)
        .bind(canonical_id)
        .fetch_all(&mut *conn)
        .await?;
    let duplicate_side: Vec<i64> = sqlx::query_scalar(&select)
        .bind(duplicate_id)
        .fetch_all(&mut *conn)
        .await?;

    // Pair uniqueness is app-enforced, so the duplicate side may itself
    // contain repeats; the seen-set squashes those too.
    let mut seen: HashSet<i64> = canonical_side.into_iter().collect();
    let mut missing: Vec<i64> = Vec::new();
    for other_id in duplicate_side {
        if seen.insert(other_id) {
            missing.push(other_id);
        }
    }

    if !missing.is_empty() {
        let mut qb: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new(format!("INSERT INTO {table} ({other_column}, device_id) "));
        qb.push_values(&missing, |mut b, other_id| {
            b.push_bind(*other_id).push_bind(canonical_id);
        });
        qb.build().execute(&mut *conn).await?;
    }

    let delete = format!("DELETE FROM {table} WHERE device_id = ?");
    sqlx::query(&delete)
        .bind(duplicate_id)
        .execute(&mut *conn)
        .await?;

    Ok(missing.len() as u64)
}

async fn transfer_rating_positions(
    conn: &mut SqliteConnection,
    canonical_id: i64,
    duplicate_id: i64,
    policy: PositionPolicy,
) -> Result<u64, DedupError> {
    let rows = sqlx::query("SELECT id, rating_id, position FROM rating_positions WHERE device_id = ?")
        .bind(duplicate_id)
        .fetch_all(&mut *conn)
        .await?;

    let mut folded = 0u64;
    for row in rows {
        let row_id: i64 = row.get("id");
        let rating_id: i64 = row.get("rating_id");
        let duplicate_position: i64 = row.get("position");

        let existing =
            sqlx::query("SELECT id, position FROM rating_positions WHERE rating_id = ? AND device_id = ?")
                .bind(rating_id)
                .bind(canonical_id)
                .fetch_optional(&mut *conn)
                .await?;

        match existing {
            None => {
                sqlx::query("UPDATE rating_positions SET device_id = ? WHERE id = ?")
                    .bind(canonical_id)
                    .bind(row_id)
                    .execute(&mut *conn)
                    .await?;
            }
            Some(existing) => {
                let canonical_row_id: i64 = existing.get("id");
                let canonical_position: i64 = existing.get("position");
                let winner = policy(canonical_position, duplicate_position);
                // Drop the duplicate's row first so the (rating, position)
                // slot is free before the canonical row takes it. The losing
                // value is discarded.
                sqlx::query("DELETE FROM rating_positions WHERE id = ?")
                    .bind(row_id)
                    .execute(&mut *conn)
                    .await?;
                if winner != canonical_position {
                    sqlx::query("UPDATE rating_positions SET position = ? WHERE id = ?")
                        .bind(winner)
                        .bind(canonical_row_id)
                        .execute(&mut *conn)
                        .await?;
                }
            }
        }
        folded += 1;
    }
    Ok(folded)
}

async fn transfer_characteristics(
    conn: &mut SqliteConnection,
    canonical_id: i64,
    duplicate_id: i64,
    action: CharacteristicsAction,
) -> Result<u64, DedupError> {
    let duplicate_profile: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM device_characteristics WHERE device_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(duplicate_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(duplicate_profile_id) = duplicate_profile else {
        return Ok(0);
    };

    let canonical_profile: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM device_characteristics WHERE device_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(canonical_id)
    .fetch_optional(&mut *conn)
    .await?;

    match canonical_profile {
        // Only the duplicate has a profile: move it. Child rows reference
        // the profile id and follow it automatically.
        None => {
            sqlx::query("UPDATE device_characteristics SET device_id = ? WHERE id = ?")
                .bind(canonical_id)
                .bind(duplicate_profile_id)
                .execute(&mut *conn)
                .await?;
            Ok(1)
        }
        Some(canonical_profile_id) => match action {
            CharacteristicsAction::KeepCanonical => {
                delete_profile(conn, duplicate_profile_id).await?;
                Ok(0)
            }
            CharacteristicsAction::UseDuplicate => {
                delete_profile(conn, canonical_profile_id).await?;
                sqlx::query("UPDATE device_characteristics SET device_id = ? WHERE id = ?")
                    .bind(canonical_id)
                    .bind(duplicate_profile_id)
                    .execute(&mut *conn)
                    .await?;
                Ok(1)
            }
            // Explicit deferral: the profile stays attached to the duplicate
            // device id, unresolved.
            CharacteristicsAction::KeepBoth => Ok(0),
        },
    }
}

async fn delete_profile(
    conn: &mut SqliteConnection,
    profile_id: i64,
) -> Result<(), DedupError> {
    for table in ["benchmarks", "cameras", "skus", "screens"] {
        let sql = format!("DELETE FROM {table} WHERE characteristics_id = ?");
        sqlx::query(&sql).bind(profile_id).execute(&mut *conn).await?;
    }
    sqlx::query("DELETE FROM device_characteristics WHERE id = ?")
        .bind(profile_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
