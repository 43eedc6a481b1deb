// API request/response models (DTOs)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database_ops::dedup::CharacteristicsAction;

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: Some(Meta::now()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            meta: Some(Meta::now()),
        }
    }
}

/// Metadata included in all API responses
#[derive(Debug, Serialize, Deserialize)]
pub struct Meta {
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    pub version: String,
}

impl Meta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            request_id: uuid::Uuid::new_v4().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Query parameters for the status listing endpoint
#[derive(Debug, Deserialize)]
pub struct StatusListQuery {
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub cursor: Option<String>,
}

fn default_status() -> String {
    "potential".to_string()
}

fn default_limit() -> i64 {
    50
}

/// Query parameters for the merge preview endpoint
#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub canonical_id: i64,
    pub duplicate_id: i64,
}

/// Query parameters for the name similarity endpoint
#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub name: String,
    pub device_type: Option<String>,
}

/// Body for the flag-only duplicate marking endpoint
#[derive(Debug, Deserialize)]
pub struct MarkDuplicateRequest {
    pub canonical_id: i64,
    pub duplicate_id: i64,
}

/// Body for the full merge endpoint
#[derive(Debug, Deserialize)]
pub struct MergeRequestBody {
    pub canonical_id: i64,
    pub duplicate_id: i64,
    #[serde(default)]
    pub characteristics_action: CharacteristicsAction,
    #[serde(default)]
    pub delete_after_merge: bool,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}
