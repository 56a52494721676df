//! Product review handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use clementine_core::ProductId;
use tracing::instrument;

use super::{ApiResponse, created, ok};
use crate::error::Result;
use crate::models::Review;
use crate::services::review::{self, AddReviewRequest, ReviewStore};
use crate::state::AppState;

/// `POST /api/reviews` - add a review (requires a qualifying purchase).
#[instrument(skip(state, request))]
pub async fn add(
    State(state): State<AppState>,
    Json(request): Json<AddReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Review>>)> {
    let saved = review::add_review(state.store(), request).await?;
    Ok(created(saved))
}

/// `GET /api/reviews/{productId}` - a product's reviews, newest first.
pub async fn list(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ApiResponse<Vec<Review>>>> {
    let reviews = state.store().reviews_for_product(product_id).await?;
    Ok(ok(reviews))
}
