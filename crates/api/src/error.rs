//! Unified error handling with Sentry integration.
//!
//! Provides a unified `ApiError` type that captures server errors to Sentry
//! before responding. All route handlers return `Result<T, ApiError>`; the
//! response body is always the `{"success": false, "message": ...}` envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::checkout::CheckoutError;
use crate::services::review::ReviewError;

/// Application-level error type for the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request failed validation; the message lists every problem.
    #[error("{0}")]
    Validation(String),

    /// A line item exceeded available stock.
    #[error("{0}")]
    InsufficientStock(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The (product, user) pair already has a review.
    #[error("You have already reviewed this product")]
    DuplicateReview,

    /// The product was never purchased by this user.
    #[error("You need to purchase this product before reviewing it")]
    PurchaseRequired,

    /// Constraint violation (e.g., address limit).
    #[error("{0}")]
    Conflict(String),

    /// A transient transaction conflict persisted past the retry budget.
    #[error("Order could not be completed, please try again")]
    TransientOrderFailure,

    /// Payment gateway failure.
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientStock { .. } => Self::InsufficientStock(err.to_string()),
            StoreError::ProductNotFound(_)
            | StoreError::CartNotFound
            | StoreError::CartItemNotFound(_)
            | StoreError::OrderNotFound(_)
            | StoreError::AddressNotFound(_) => Self::NotFound(err.to_string()),
            StoreError::DuplicateReview => Self::DuplicateReview,
            StoreError::PurchaseRequired => Self::PurchaseRequired,
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Transient(_) => Self::TransientOrderFailure,
            StoreError::Database(_) | StoreError::DataCorruption(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Validation(_) => Self::Validation(err.to_string()),
            CheckoutError::Store(store) => store.into(),
        }
    }
}

impl From<ReviewError> for ApiError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Validation(_) => Self::Validation(err.to_string()),
            ReviewError::Store(store) => store.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Internal(_) | Self::TransientOrderFailure) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Validation(_) | Self::DuplicateReview => StatusCode::BAD_REQUEST,
            Self::InsufficientStock(_) | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PurchaseRequired => StatusCode::FORBIDDEN,
            Self::TransientOrderFailure | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PaymentGateway(_) => StatusCode::BAD_GATEWAY,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) => "Internal server error".to_owned(),
            _ => self.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clementine_core::ProductId;

    use super::*;

    fn get_status(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn status_codes_follow_the_error_taxonomy() {
        assert_eq!(
            get_status(ApiError::Validation("cartItems must not be empty".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(ApiError::InsufficientStock("out of stock".to_owned())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ApiError::NotFound("order 9".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(ApiError::DuplicateReview), StatusCode::BAD_REQUEST);
        assert_eq!(get_status(ApiError::PurchaseRequired), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(ApiError::TransientOrderFailure),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(ApiError::PaymentGateway("timeout".to_owned())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn store_errors_map_to_their_api_variants() {
        let err: ApiError = StoreError::InsufficientStock {
            product_id: ProductId::new(1),
            title: "Widget".to_owned(),
            available: 1,
            requested: 3,
        }
        .into();
        assert!(matches!(err, ApiError::InsufficientStock(_)));
        assert!(err.to_string().contains("Widget"));

        let err: ApiError = StoreError::PurchaseRequired.into();
        assert!(matches!(err, ApiError::PurchaseRequired));

        let err: ApiError = StoreError::Transient("serialization".to_owned()).into();
        assert!(matches!(err, ApiError::TransientOrderFailure));
    }

    #[test]
    fn internal_details_are_hidden_from_clients() {
        let err = ApiError::Internal("connection pool exhausted".to_owned());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
