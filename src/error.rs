use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::quota::QuotaError;
use crate::utils::error_codes;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("quota store unavailable: {0}")]
    Quota(#[from] QuotaError),
}

#[derive(Serialize)]
struct ErrorResponse {
    code: i32,
    error_message: String,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, i32) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND),
            AppError::Conflict(_) => (StatusCode::CONFLICT, error_codes::CONFLICT),
            AppError::Quota(_) => (StatusCode::SERVICE_UNAVAILABLE, error_codes::INTERNAL_ERROR),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // 数据库错误细节只写日志，不返回给客户端
        let error_message = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Internal server error".to_string()
            }
            AppError::Quota(e) => {
                tracing::error!("Quota store error: {}", e);
                "Usage tracking is temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code,
            error_message,
        });

        (status, body).into_response()
    }
}
