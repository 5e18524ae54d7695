//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers return `Result<T, AppError>`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use atelier_core::CoreError;

use crate::store::StoreError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// State changed underneath the request (e.g. stale cart version).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failed while performing `action`. Rolled back.
    #[error("could not {action}: {source}")]
    Persistence {
        action: &'static str,
        source: StoreError,
    },

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convert a store error, naming the user-facing action for storage failures
    /// (e.g. `"update cart"`, `"place order"`).
    #[must_use]
    pub fn from_store(action: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Domain(domain) => domain.into(),
            source @ StoreError::Persistence(_) => Self::Persistence { action, source },
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(what) => Self::NotFound(what),
            CoreError::Validation(msg) => Self::BadRequest(msg),
            CoreError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

impl From<StoreError> for AppError {
    /// Reads with no more specific action to report.
    fn from(err: StoreError) -> Self {
        Self::from_store("load data", err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Persistence { .. } | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Persistence { .. } | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Persistence { action, .. } => format!("could not {action}"),
            Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_text(err: AppError) -> (StatusCode, String) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_core_errors_map_to_client_errors() {
        assert!(matches!(
            AppError::from(CoreError::not_found("cart 1")),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(CoreError::validation("quantity")),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            AppError::from(CoreError::conflict("stale")),
            AppError::Conflict(_)
        ));
    }

    #[tokio::test]
    async fn test_app_error_status_codes() {
        assert_eq!(
            body_text(AppError::NotFound("test".to_string())).await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            body_text(AppError::BadRequest("test".to_string())).await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            body_text(AppError::Conflict("test".to_string())).await.0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            body_text(AppError::Internal("test".to_string())).await.0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_persistence_errors_hide_details() {
        let err = AppError::from_store(
            "update cart",
            StoreError::persistence("connection reset by peer"),
        );
        let (status, body) = body_text(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "could not update cart");

        let err = AppError::from_store("place order", StoreError::persistence("disk full"));
        assert_eq!(body_text(err).await.1, "could not place order");
    }

    #[test]
    fn test_domain_store_errors_pass_through() {
        let err = AppError::from_store(
            "place order",
            StoreError::Domain(CoreError::validation("cannot place an order for an empty cart")),
        );
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
