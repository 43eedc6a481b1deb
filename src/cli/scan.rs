use anyhow::Result;

use crate::database_ops::db::Db;
use crate::database_ops::dedup::scanner;
use crate::normalization::DefaultNormalizer;

/// Run a full duplicate scan and print the report.
pub async fn run(db: &Db) -> Result<()> {
    let report = scanner::scan_for_duplicates(db, &DefaultNormalizer).await?;
    println!("names backfilled : {}", report.backfilled);
    println!("groups found     : {}", report.groups_found);
    println!("devices marked   : {}", report.devices_marked);
    Ok(())
}
