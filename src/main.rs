use anyhow::Result;
use clap::{Parser, Subcommand};

use device_compare::cli;
use device_compare::database_ops::db::Db;
use device_compare::util::env as env_util;

#[derive(Parser)]
#[command(name = "device-compare", about = "Operator tooling for the device catalogue duplicate engine")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Backfill normalized names and flag potential duplicate groups
    Scan,
    /// Device counts by duplicate status
    Stats,
    /// List devices by duplicate status
    List {
        /// potential | duplicate | all_non_unique
        #[arg(long, default_value = "potential")]
        status: String,
        #[arg(long, default_value_t = 50)]
        limit: i64,
        /// Opaque cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();
    env_util::init_env();

    let args = Args::parse();

    let database_url = env_util::db_url();
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 5u32);
    let db = Db::connect(&database_url, max_connections).await?;

    match args.command {
        Command::Scan => cli::scan::run(&db).await,
        Command::Stats => cli::stats::run(&db).await,
        Command::List {
            status,
            limit,
            cursor,
        } => cli::list::run(&db, &status, limit, cursor.as_deref()).await,
    }
}
