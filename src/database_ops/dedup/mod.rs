//! Duplicate-resolution core: scanner, merge preview, the transactional
//! merge executor and the status query surface.
//!
//! The one invariant everything here defends is "no chains": a device
//! flagged `duplicate` must point at a device that is itself not a
//! duplicate. It is enforced procedurally at every write site because it is
//! richer than what a foreign key can express.

pub mod merge;
pub mod preview;
pub mod scanner;
pub mod status;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use super::db::Db;
use super::devices::{fetch_device, Device, DuplicateStatus};

#[derive(Debug, Error)]
pub enum DedupError {
    /// Caller mistake (bad ids, bad flag combination). Not retryable.
    #[error("{0}")]
    Validation(String),
    #[error("device {0} not found")]
    NotFound(i64),
    /// Invariant guard, most importantly "the target of a merge must not
    /// itself be flagged duplicate".
    #[error("{0}")]
    Precondition(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// What to do when both sides of a merge carry a characteristics profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacteristicsAction {
    #[default]
    KeepCanonical,
    UseDuplicate,
    KeepBoth,
}

fn duplicate_target_guard(canonical: &Device) -> Result<(), DedupError> {
    if canonical.duplicate_status == DuplicateStatus::Duplicate {
        return Err(DedupError::Precondition(format!(
            "device {} is itself flagged duplicate; resolve that flag before merging into it",
            canonical.id
        )));
    }
    Ok(())
}

/// Shared precondition block for preview and merge: ids differ, both
/// devices exist, and the canonical side is not itself a duplicate.
pub(crate) async fn load_merge_pair(
    db: &Db,
    canonical_id: i64,
    duplicate_id: i64,
) -> Result<(Device, Device), DedupError> {
    if canonical_id == duplicate_id {
        return Err(DedupError::Validation(
            "canonical and duplicate ids must differ".into(),
        ));
    }
    let canonical = fetch_device(&db.pool, canonical_id).await?;
    let duplicate = fetch_device(&db.pool, duplicate_id).await?;
    duplicate_target_guard(&canonical)?;
    Ok((canonical, duplicate))
}

/// Flag-only transition {unique, potential} -> duplicate. No relations move;
/// that is what a full merge is for.
#[instrument(skip(db))]
pub async fn mark_as_duplicate(
    db: &Db,
    canonical_id: i64,
    duplicate_id: i64,
) -> Result<(), DedupError> {
    let (_, duplicate) = load_merge_pair(db, canonical_id, duplicate_id).await?;
    if duplicate.duplicate_status == DuplicateStatus::Duplicate {
        return Err(DedupError::Precondition(format!(
            "device {duplicate_id} is already flagged duplicate; resolve it as unique first"
        )));
    }

    let now = Utc::now();
    let mut tx = db.pool.begin().await?;
    sqlx::query(
        "UPDATE devices SET duplicate_status = 'duplicate', duplicate_of_id = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(canonical_id)
    .bind(now)
    .bind(duplicate_id)
    .execute(&mut *tx)
    .await?;
    // Anything already pointing at the newly flagged device would become a
    // chain; repoint it at the same canonical.
    sqlx::query(
        "UPDATE devices SET duplicate_of_id = ?, updated_at = ? \
         WHERE duplicate_status = 'duplicate' AND duplicate_of_id = ?",
    )
    .bind(canonical_id)
    .bind(now)
    .bind(duplicate_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(canonical = canonical_id, duplicate = duplicate_id, "device flagged duplicate");
    Ok(())
}

/// Human override back to `unique`: dismisses a scanner suggestion or
/// un-flags a confirmed duplicate. Does not undo relation transfers from
/// any prior merge.
#[instrument(skip(db))]
pub async fn resolve_as_unique(db: &Db, device_id: i64) -> Result<(), DedupError> {
    fetch_device(&db.pool, device_id).await?;
    sqlx::query(
        "UPDATE devices SET duplicate_status = 'unique', duplicate_of_id = NULL, updated_at = ? \
         WHERE id = ?",
    )
    .bind(Utc::now())
    .bind(device_id)
    .execute(&db.pool)
    .await?;
    info!(device = device_id, "device resolved as unique");
    Ok(())
}
