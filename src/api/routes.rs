// API route configuration

use actix_web::web;

use crate::api::handlers;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Health check
        .route("/health", web::get().to(handlers::health_check))
        .route("/", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/v1/dedup")
                .route("/scan", web::post().to(handlers::scan_for_duplicates))
                .route("/stats", web::get().to(handlers::get_duplicate_stats))
                .route("/devices", web::get().to(handlers::get_devices_by_status))
                .route(
                    "/devices/{id}/candidates",
                    web::get().to(handlers::get_duplicate_candidates),
                )
                .route(
                    "/devices/{id}/resolve",
                    web::post().to(handlers::resolve_as_unique),
                )
                .route("/similar", web::get().to(handlers::find_similar_by_name))
                .route("/mark", web::post().to(handlers::mark_as_duplicate))
                .route("/preview", web::get().to(handlers::get_merge_preview))
                .route("/merge", web::post().to(handlers::merge)),
        );
}
