use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Errors surfaced by the HTTP handlers.
///
/// The `Display` output is only logged; clients get [`ApiError::code`].
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("content is missing or blank")]
    ContentRequired,
    #[error("ttl_seconds must be an integer >= 1")]
    InvalidTtlSeconds,
    #[error("max_views must be an integer >= 1")]
    InvalidMaxViews,
    #[error("malformed request body: {source}")]
    InvalidJson {
        #[from]
        source: JsonRejection,
    },
    #[error("timed out waiting for paste row lock")]
    LockTimeout,
    #[error("database error: {source}")]
    Database { source: sqlx::Error },
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::ContentRequired => StatusCode::BAD_REQUEST,
            ApiError::InvalidTtlSeconds => StatusCode::BAD_REQUEST,
            ApiError::InvalidMaxViews => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson { .. } if self.is_payload_too_large() => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            ApiError::InvalidJson { .. } => StatusCode::BAD_REQUEST,
            ApiError::LockTimeout => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code sent to the client.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "not_found",
            ApiError::ContentRequired => "content_required",
            ApiError::InvalidTtlSeconds => "invalid_ttl_seconds",
            ApiError::InvalidMaxViews => "invalid_max_views",
            ApiError::InvalidJson { .. } if self.is_payload_too_large() => "payload_too_large",
            ApiError::InvalidJson { .. } => "invalid_json",
            ApiError::LockTimeout | ApiError::Database { .. } => "internal_server_error",
        }
    }

    fn is_payload_too_large(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidJson { source } if source.status() == StatusCode::PAYLOAD_TOO_LARGE
        )
    }

    /// Log store faults with their full detail. Client errors are not logged.
    pub(crate) fn log(&self) {
        if self.status_code().is_server_error() {
            error!("request failed: {self:?}");
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        (self.status_code(), Json(json!({ "error": self.code() }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            _ => ApiError::Database { source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_faults_hide_their_detail() {
        let error = ApiError::from(sqlx::Error::PoolTimedOut);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.code(), "internal_server_error");
        assert_eq!(ApiError::LockTimeout.code(), "internal_server_error");
    }

    #[test]
    fn lock_timeout_is_a_server_error() {
        assert_eq!(
            ApiError::LockTimeout.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        let response = ApiError::LockTimeout.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_row_is_not_found() {
        let error = ApiError::from(sqlx::Error::RowNotFound);
        assert!(matches!(error, ApiError::NotFound));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }
}
