//! The review gate: one review per (product, user), only after a completed
//! purchase, with the product's cached average rating refreshed on insert.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use clementine_core::{ProductId, UserId};

use crate::db::StoreError;
use crate::models::{NewReview, Review};

/// Storage seam for the review gate.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Whether the (product, user) pair already has a review.
    async fn review_exists(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, StoreError>;

    /// Whether the user has a confirmed or delivered order containing the
    /// product.
    async fn has_qualifying_purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, StoreError>;

    /// Insert the review and refresh the product's cached average rating
    /// (arithmetic mean of all review values, rounded to 2 decimals).
    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError>;

    /// Fetch a product's reviews, newest first.
    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<Review>, StoreError>;
}

/// Review failure.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Review submission body (camelCase wire form).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReviewRequest {
    pub product_id: Option<ProductId>,
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub review_message: String,
    pub review_value: Option<i32>,
}

/// Add a review, enforcing the purchase gate and the one-review-per-pair
/// rule.
///
/// # Errors
///
/// `ReviewError::Validation` listing every rejected field, or
/// `StoreError::DuplicateReview` / `StoreError::PurchaseRequired` from the
/// gate.
pub async fn add_review<S>(store: &S, request: AddReviewRequest) -> Result<Review, ReviewError>
where
    S: ReviewStore + ?Sized,
{
    let review = validate(&request)?;

    if store
        .review_exists(review.product_id, review.user_id)
        .await?
    {
        return Err(StoreError::DuplicateReview.into());
    }

    if !store
        .has_qualifying_purchase(review.user_id, review.product_id)
        .await?
    {
        return Err(StoreError::PurchaseRequired.into());
    }

    Ok(store.insert_review(review).await?)
}

fn validate(request: &AddReviewRequest) -> Result<NewReview, ReviewError> {
    let mut errors = Vec::new();

    if request.product_id.is_none() {
        errors.push("productId is required".to_owned());
    }
    if request.user_id.is_none() {
        errors.push("userId is required".to_owned());
    }
    if request.user_name.trim().is_empty() {
        errors.push("userName is required".to_owned());
    }
    if request.review_message.trim().is_empty() {
        errors.push("reviewMessage is required".to_owned());
    }
    match request.review_value {
        None => errors.push("reviewValue is required".to_owned()),
        Some(value) if !(1..=5).contains(&value) => {
            errors.push("reviewValue must be between 1 and 5".to_owned());
        }
        Some(_) => {}
    }

    if !errors.is_empty() {
        return Err(ReviewError::Validation(errors));
    }

    match (request.product_id, request.user_id, request.review_value) {
        (Some(product_id), Some(user_id), Some(review_value)) => Ok(NewReview {
            product_id,
            user_id,
            user_name: request.user_name.clone(),
            review_message: request.review_message.clone(),
            review_value,
        }),
        _ => Err(ReviewError::Validation(vec!["invalid request".to_owned()])),
    }
}
