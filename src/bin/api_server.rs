// HTTP API server binary for the device catalogue duplicate engine

use anyhow::Result;
use device_compare::api::ApiServer;
use device_compare::database_ops::db::Db;
use device_compare::util::env as env_util;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    tracing::info!("Initializing device-compare API server");

    env_util::init_env();
    let server = ApiServer::from_env()?;

    let database_url = env_util::db_url();
    let max_connections: u32 = env_util::env_parse("DB_MAX_CONNS", 10u32);
    let db = Db::connect(&database_url, max_connections).await?;

    tracing::info!("Database connected successfully");

    server.run(db).await?;
    Ok(())
}
