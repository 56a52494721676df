//! Postgres implementation of the review store.
//!
//! The purchase gate probes the frozen order snapshots directly: order
//! items live as JSONB with camelCase keys, so qualification is a
//! `jsonb_array_elements` scan over the user's confirmed and delivered
//! orders.

use async_trait::async_trait;

use clementine_core::{ProductId, UserId};

use super::{PgStore, StoreError};
use crate::models::{NewReview, Review};
use crate::services::review::ReviewStore;

const REVIEW_COLUMNS: &str =
    "id, product_id, user_id, user_name, review_message, review_value, created_at";

/// Map constraint violations on insert to their domain errors.
fn classify_insert_error(e: sqlx::Error, product_id: ProductId) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && let Some(code) = db_err.code()
    {
        if code == "23505" {
            return StoreError::DuplicateReview;
        }
        if code == "23503" {
            return StoreError::ProductNotFound(product_id);
        }
    }
    StoreError::from_db(e)
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn review_exists(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM shop.reviews WHERE product_id = $1 AND user_id = $2)",
        )
        .bind(product_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(exists)
    }

    async fn has_qualifying_purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, StoreError> {
        let (exists,): (bool,) = sqlx::query_as(
            r"
            SELECT EXISTS (
                SELECT 1
                FROM shop.orders o, jsonb_array_elements(o.items) item
                WHERE o.user_id = $1
                  AND o.order_status IN ('confirmed', 'delivered')
                  AND (item->>'productId')::int = $2
            )
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_one(self.pool())
        .await?;

        Ok(exists)
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut tx = self.pool().begin().await.map_err(StoreError::from_db)?;

        let saved = sqlx::query_as::<_, Review>(&format!(
            r"
            INSERT INTO shop.reviews
                (product_id, user_id, user_name, review_message, review_value)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(&review.user_name)
        .bind(&review.review_message)
        .bind(review.review_value)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| classify_insert_error(e, review.product_id))?;

        // Refresh the cached average inside the same transaction so readers
        // never observe a review without its effect on the mean.
        sqlx::query(
            r"
            UPDATE shop.products
            SET average_review = (
                SELECT ROUND(AVG(review_value)::numeric, 2)
                FROM shop.reviews
                WHERE product_id = $1
            )
            WHERE id = $1
            ",
        )
        .bind(review.product_id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_db)?;

        tx.commit().await.map_err(StoreError::from_db)?;
        Ok(saved)
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<Review>, StoreError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM shop.reviews WHERE product_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool())
        .await?;

        Ok(reviews)
    }
}
