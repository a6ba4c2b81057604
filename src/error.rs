use axum::{extract::rejection::JsonRejection, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{openrouter::GenerationError, stripe::{CheckoutError, WebhookError}, unsplash::ImageError};

pub type AppResult<T> = Result<T, AppError>;

/// Request-level failures as seen by the HTTP layer.
///
/// Display carries the internal detail for logs; clients only ever get
/// [`AppError::public_message`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("invalid response format: {0}")]
    Format(String),
    #[error("empty response from provider")]
    EmptyResponse,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Config(_) | AppError::Upstream(_) | AppError::Format(_) | AppError::EmptyResponse => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Format(_) => "FORMAT_ERROR",
            AppError::EmptyResponse => "EMPTY_RESPONSE",
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::Conflict(msg) => msg.clone(),
            AppError::Unauthorized => "authentication required".to_string(),
            AppError::Config(_) => "service not configured".to_string(),
            AppError::Upstream(_) | AppError::Format(_) | AppError::EmptyResponse => {
                "the provider could not complete the request, please try again".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("❌ {}", self);
        } else {
            warn!("⚠️ {}", self);
        }
        let body = Json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.public_message(),
            }
        }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<GenerationError> for AppError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Config => AppError::Config(err.to_string()),
            GenerationError::Upstream(detail) => AppError::Upstream(detail),
            GenerationError::EmptyResponse => AppError::EmptyResponse,
            GenerationError::Format(detail) => AppError::Format(detail),
        }
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Config => AppError::Config(err.to_string()),
            ImageError::BadRequest => AppError::Validation("query is required".to_string()),
            ImageError::Upstream(detail) => AppError::Upstream(detail),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Config => AppError::Config(err.to_string()),
            CheckoutError::UnknownPlan(_) | CheckoutError::MissingEmail => AppError::Validation(err.to_string()),
            CheckoutError::Upstream(detail) => AppError::Upstream(detail),
        }
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Config => AppError::Config(err.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}
