//! Error types and error handling
//!
//! [`ShopError`] is returned by every [`JobService`](crate::service::JobService)
//! operation and renders itself as an HTTP response:
//!
//! | Variant | Status | Body |
//! |---|---|---|
//! | `Validation` | 422 | `{"errors": {field: [messages]}}` |
//! | `MalformedBody` | 400 | `{"error": "..."}` |
//! | `JobNotFound`, `TechNotFound` | 404 | `{"error": "..."}` |
//! | `Storage` | 500 | `{"error": "Internal server error"}` |

use crate::extractors::validation_errors_json;
use crate::model::{JobId, TechId};
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result alias for service operations
pub type ShopResult<T> = Result<T, ShopError>;

/// Service error type
#[derive(Debug, Error)]
pub enum ShopError {
    /// Request data failed validation
    #[error("Validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// Request body could not be parsed
    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    /// Referenced job does not exist
    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    /// Referenced tech does not exist on the job
    #[error("Tech {tech} not found on job {job}")]
    TechNotFound {
        /// Parent job
        job: JobId,
        /// Missing tech
        tech: TechId,
    },

    /// Underlying store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ShopError {
    /// HTTP status for this error
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::JobNotFound(_) | Self::TechNotFound { .. } => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            Self::Validation(errors) => validation_errors_json(errors),
            Self::MalformedBody(_) => json!({ "error": self.to_string() }),
            Self::JobNotFound(_) => json!({ "error": "Job not found" }),
            Self::TechNotFound { .. } => json!({ "error": "Tech not found" }),
            Self::Storage(error) => {
                tracing::error!(%error, "Store operation failed");
                json!({ "error": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}
