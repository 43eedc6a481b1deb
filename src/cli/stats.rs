use anyhow::Result;

use crate::database_ops::db::Db;
use crate::database_ops::dedup::status;

/// Print device counts by duplicate status.
pub async fn run(db: &Db) -> Result<()> {
    let stats = status::duplicate_stats(db).await?;
    println!("unique    : {}", stats.unique);
    println!("potential : {}", stats.potential);
    println!("duplicate : {}", stats.duplicate);
    Ok(())
}
