// API server implementation using actix-web

use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{Compress, Logger};
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::env;

use crate::api::routes;
use crate::database_ops::db::Db;

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        crate::util::env::init_env();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("Invalid API_PORT")?;
        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Ok(Self {
            host,
            port,
            allowed_origins,
        })
    }

    fn cors(allowed_origins: &str) -> Cors {
        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
            .max_age(3600);
        for origin in allowed_origins.split(',') {
            cors = cors.allowed_origin(origin.trim());
        }
        cors
    }

    /// Start the HTTP server
    pub async fn run(self, db: Db) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            "Starting device-compare API server"
        );

        let db_data = web::Data::new(db);
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            App::new()
                .app_data(db_data.clone())
                .wrap(Logger::default())
                .wrap(Compress::default())
                .wrap(Self::cors(&allowed_origins))
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
