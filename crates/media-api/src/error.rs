//! API error taxonomy and HTTP status mapping.
//!
//! Adapters never recover from parse failures; every failure is carried up
//! as an [`ApiError`] and mapped to a status code at the HTTP boundary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shared::{unix_now, ErrorBody};

/// Result alias for request handling
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid parameter: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("unexpected document shape on {page}: no match for `{selector}`")]
    Shape {
        page: &'static str,
        selector: String,
    },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Missing-element shape error for a given page and selector
    pub fn shape(page: &'static str, selector: impl Into<String>) -> Self {
        Self::Shape {
            page,
            selector: selector.into(),
        }
    }

    /// HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Shape { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable error label
    fn label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Upstream(_) => "upstream_error",
            Self::Shape { .. } => "parse_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorBody {
            error: self.label().to_string(),
            detail: self.to_string(),
            timestamp: unix_now(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("page must be >= 1".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::NotFound("no results".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::shape("movie listing", "div.flw-item").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_shape_error_names_page_and_selector() {
        let err = ApiError::shape("anime details", "div.anime_info_body_bg");
        let msg = err.to_string();
        assert!(msg.contains("anime details"));
        assert!(msg.contains("div.anime_info_body_bg"));
    }
}
