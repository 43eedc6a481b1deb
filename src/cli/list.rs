use anyhow::Result;

use crate::database_ops::db::Db;
use crate::database_ops::dedup::status::{self, StatusFilter};

/// List devices by duplicate status, one line per device.
pub async fn run(db: &Db, status_raw: &str, limit: i64, cursor: Option<&str>) -> Result<()> {
    let filter = StatusFilter::parse(status_raw).ok_or_else(|| {
        anyhow::anyhow!("unknown status '{status_raw}' (expected potential | duplicate | all_non_unique)")
    })?;

    let page = status::devices_by_duplicate_status(db, filter, limit, cursor).await?;
    for entry in &page.devices {
        let d = &entry.device;
        match (&entry.duplicate_of_name, d.duplicate_of_id) {
            (Some(canonical), Some(id)) => println!(
                "{:>6}  {:<10}  {}  -> {} (#{id})",
                d.id, d.duplicate_status, d.name, canonical
            ),
            _ => println!("{:>6}  {:<10}  {}", d.id, d.duplicate_status, d.name),
        }
    }
    if let Some(cursor) = page.next_cursor {
        println!("-- more: --cursor {cursor}");
    }
    Ok(())
}
