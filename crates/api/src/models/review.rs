//! Product review domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clementine_core::{ProductId, ReviewId, UserId};

/// A product review.
///
/// At most one review per `(product_id, user_id)` pair, enforced by a
/// unique index and surfaced as `DuplicateReview`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: String,
    pub review_message: String,
    pub review_value: i32,
    pub created_at: DateTime<Utc>,
}

/// A validated review ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub user_id: UserId,
    pub user_name: String,
    pub review_message: String,
    pub review_value: i32,
}
