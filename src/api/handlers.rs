// HTTP request handlers for the duplicate-resolution endpoints

use actix_web::{web, HttpResponse, Result};

use crate::api::models::*;
use crate::database_ops::db::Db;
use crate::database_ops::dedup::merge::{merge_duplicate, MergeRequest};
use crate::database_ops::dedup::status::StatusFilter;
use crate::database_ops::dedup::{self, preview, scanner, status, DedupError};
use crate::normalization::DefaultNormalizer;

/// Map the dedup error taxonomy onto HTTP statuses. Database failures are
/// logged server-side and surface as an opaque 500.
fn error_response(err: DedupError) -> HttpResponse {
    match &err {
        DedupError::Validation(_) => {
            HttpResponse::BadRequest().json(ApiResponse::<()>::error(err.to_string()))
        }
        DedupError::NotFound(_) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error(err.to_string()))
        }
        DedupError::Precondition(_) => {
            HttpResponse::Conflict().json(ApiResponse::<()>::error(err.to_string()))
        }
        DedupError::Database(db_err) => {
            tracing::error!(error = %db_err, "dedup operation failed");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("internal error"))
        }
    }
}

/// Health check endpoint
pub async fn health_check(db: web::Data<Db>) -> Result<HttpResponse> {
    let db_status = match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&db.pool)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let response = ApiResponse::success(serde_json::json!({
        "status": "healthy",
        "database": db_status,
    }));
    Ok(HttpResponse::Ok().json(response))
}

/// Trigger a full duplicate scan
pub async fn scan_for_duplicates(db: web::Data<Db>) -> Result<HttpResponse> {
    Ok(
        match scanner::scan_for_duplicates(db.get_ref(), &DefaultNormalizer).await {
            Ok(report) => HttpResponse::Ok().json(ApiResponse::success(report)),
            Err(err) => error_response(err),
        },
    )
}

/// Duplicate candidates for one device, enriched for side-by-side review
pub async fn get_duplicate_candidates(
    path: web::Path<i64>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    let device_id = path.into_inner();
    Ok(
        match status::duplicate_candidates(db.get_ref(), device_id, &DefaultNormalizer).await {
            Ok(set) => HttpResponse::Ok().json(ApiResponse::success(set)),
            Err(err) => error_response(err),
        },
    )
}

/// Name similarity lookup (exact on normalized name, substring fallback)
pub async fn find_similar_by_name(
    query: web::Query<SimilarQuery>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    Ok(
        match status::find_similar_by_name(
            db.get_ref(),
            &query.name,
            query.device_type.as_deref(),
            &DefaultNormalizer,
        )
        .await
        {
            Ok(matches) => HttpResponse::Ok().json(ApiResponse::success(matches)),
            Err(err) => error_response(err),
        },
    )
}

/// Flag-only duplicate marking (no relation transfer)
pub async fn mark_as_duplicate(
    payload: web::Json<MarkDuplicateRequest>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    Ok(
        match dedup::mark_as_duplicate(db.get_ref(), payload.canonical_id, payload.duplicate_id)
            .await
        {
            Ok(()) => {
                HttpResponse::Ok().json(ApiResponse::success(SuccessResponse { success: true }))
            }
            Err(err) => error_response(err),
        },
    )
}

/// Human override back to unique (false-positive dismissal / un-flagging)
pub async fn resolve_as_unique(path: web::Path<i64>, db: web::Data<Db>) -> Result<HttpResponse> {
    let device_id = path.into_inner();
    Ok(match dedup::resolve_as_unique(db.get_ref(), device_id).await {
        Ok(()) => HttpResponse::Ok().json(ApiResponse::success(SuccessResponse { success: true })),
        Err(err) => error_response(err),
    })
}

/// Read-only merge preview
pub async fn get_merge_preview(
    query: web::Query<PreviewQuery>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    Ok(
        match preview::merge_preview(db.get_ref(), query.canonical_id, query.duplicate_id).await {
            Ok(preview) => HttpResponse::Ok().json(ApiResponse::success(preview)),
            Err(err) => error_response(err),
        },
    )
}

/// The transactional merge itself
pub async fn merge(payload: web::Json<MergeRequestBody>, db: web::Data<Db>) -> Result<HttpResponse> {
    let req = MergeRequest {
        canonical_id: payload.canonical_id,
        duplicate_id: payload.duplicate_id,
        characteristics_action: payload.characteristics_action,
        delete_after_merge: payload.delete_after_merge,
    };
    Ok(match merge_duplicate(db.get_ref(), req).await {
        Ok(outcome) => HttpResponse::Ok().json(ApiResponse::success(outcome)),
        Err(err) => error_response(err),
    })
}

/// Paginated listing by duplicate status
pub async fn get_devices_by_status(
    query: web::Query<StatusListQuery>,
    db: web::Data<Db>,
) -> Result<HttpResponse> {
    let Some(filter) = StatusFilter::parse(&query.status) else {
        return Ok(error_response(DedupError::Validation(format!(
            "unknown status '{}' (expected potential | duplicate | all_non_unique)",
            query.status
        ))));
    };
    Ok(
        match status::devices_by_duplicate_status(
            db.get_ref(),
            filter,
            query.limit,
            query.cursor.as_deref(),
        )
        .await
        {
            Ok(page) => HttpResponse::Ok().json(ApiResponse::success(page)),
            Err(err) => error_response(err),
        },
    )
}

/// Device counts by duplicate status
pub async fn get_duplicate_stats(db: web::Data<Db>) -> Result<HttpResponse> {
    Ok(match status::duplicate_stats(db.get_ref()).await {
        Ok(stats) => HttpResponse::Ok().json(ApiResponse::success(stats)),
        Err(err) => error_response(err),
    })
}
