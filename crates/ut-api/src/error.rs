//! HTTP adapter mapping for domain errors.
//!
//! `AppError` stays HTTP-agnostic in `ut-core`; this wrapper gives it a status
//! code and the `{success: false, message}` body every endpoint shares.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use ut_core::error::AppError;

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub AppError);

impl ApiError {
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self(AppError::invalid(field, message))
    }
}

fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::ValidationError { .. } | AppError::MissingCollege => StatusCode::BAD_REQUEST,
        AppError::AuthRequired | AppError::InvalidSession | AppError::InvalidCredentials => {
            StatusCode::UNAUTHORIZED
        }
        AppError::Forbidden(_) | AppError::Unavailable(_) | AppError::Blocked => StatusCode::FORBIDDEN,
        AppError::NotFound(..) | AppError::NotInWishlist => StatusCode::NOT_FOUND,
        AppError::Conflict { .. } | AppError::AlreadyExists(_) => StatusCode::CONFLICT,
        AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// The message clients see. Internal details never leave the server.
fn public_message(error: &AppError) -> String {
    match error {
        AppError::NotFound(kind, _) => format!("{kind} not found"),
        AppError::ValidationError { field, message } => format!("{field}: {message}"),
        AppError::Forbidden(reason) => reason.clone(),
        AppError::Internal(_) => "Internal server error".to_string(),
        other => other.to_string(),
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        status_for(&self.0)
    }

    fn error_response(&self) -> HttpResponse {
        match &self.0 {
            AppError::Internal(detail) => tracing::error!(%detail, "request failed"),
            other => tracing::debug!(error = %other, "request rejected"),
        }
        let mut body = json!({ "success": false, "message": public_message(&self.0) });
        if let AppError::ValidationError { field, .. } = &self.0 {
            body["field"] = json!(field);
        }
        HttpResponse::build(self.status_code()).json(body)
    }
}
