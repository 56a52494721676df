//! Cart repository.
//!
//! One cart per user. Stock is only advisory here - the checkout
//! transaction re-validates every line against live product rows.

use sqlx::PgPool;

use clementine_core::{CartId, ProductId, UserId};

use super::StoreError;
use crate::models::{Cart, CartLine, Product};

/// Repository for cart operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's cart, creating an empty one if none exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<CartId, StoreError> {
        // DO UPDATE instead of DO NOTHING so RETURNING always yields a row
        let (id,): (CartId,) = sqlx::query_as(
            r"
            INSERT INTO shop.carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// Add a product to the user's cart, accumulating quantity if the line
    /// already exists. Snapshots the effective price at add time.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ProductNotFound` for an unknown product and
    /// `StoreError::InsufficientStock` when the combined quantity exceeds
    /// the available stock.
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart, StoreError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, title, description, category, brand, image,
                   price, sale_price, total_stock, average_review
            FROM shop.products
            WHERE id = $1
            ",
        )
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StoreError::ProductNotFound(product_id))?;

        let cart_id = self.get_or_create(user_id).await?;

        let existing: Option<(i32,)> = sqlx::query_as(
            "SELECT quantity FROM shop.cart_items WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        let combined = existing.map_or(0, |(q,)| q).saturating_add(quantity);
        if combined > product.total_stock {
            return Err(StoreError::InsufficientStock {
                product_id,
                title: product.title,
                available: product.total_stock,
                requested: combined,
            });
        }

        sqlx::query(
            r"
            INSERT INTO shop.cart_items (cart_id, product_id, quantity, price_snapshot)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id)
            DO UPDATE SET quantity = shop.cart_items.quantity + EXCLUDED.quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(product.effective_price())
        .execute(self.pool)
        .await?;

        self.fetch_by_id(cart_id, user_id).await
    }

    /// Fetch the user's cart with its items joined against live products.
    ///
    /// Returns an empty cart (without creating one) when the user has none.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn fetch(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let cart: Option<(CartId,)> =
            sqlx::query_as("SELECT id FROM shop.carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        match cart {
            Some((id,)) => self.fetch_by_id(id, user_id).await,
            None => Ok(Cart {
                id: None,
                user_id,
                items: Vec::new(),
            }),
        }
    }

    /// Set the quantity of an existing cart line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CartItemNotFound` when the line does not exist.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Cart, StoreError> {
        let cart_id = self.require_cart(user_id).await?;

        let result = sqlx::query(
            "UPDATE shop.cart_items SET quantity = $1 WHERE cart_id = $2 AND product_id = $3",
        )
        .bind(quantity)
        .bind(cart_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartItemNotFound(product_id));
        }

        self.fetch_by_id(cart_id, user_id).await
    }

    /// Remove a line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CartItemNotFound` when the line does not exist.
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Cart, StoreError> {
        let cart_id = self.require_cart(user_id).await?;

        let result =
            sqlx::query("DELETE FROM shop.cart_items WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::CartItemNotFound(product_id));
        }

        self.fetch_by_id(cart_id, user_id).await
    }

    async fn require_cart(&self, user_id: UserId) -> Result<CartId, StoreError> {
        let cart: Option<(CartId,)> =
            sqlx::query_as("SELECT id FROM shop.carts WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;

        cart.map(|(id,)| id).ok_or(StoreError::CartNotFound)
    }

    async fn fetch_by_id(&self, cart_id: CartId, user_id: UserId) -> Result<Cart, StoreError> {
        let items = sqlx::query_as::<_, CartLine>(
            r"
            SELECT i.product_id, p.title, p.image, p.price, p.sale_price,
                   i.price_snapshot, i.quantity
            FROM shop.cart_items i
            JOIN shop.products p ON p.id = i.product_id
            WHERE i.cart_id = $1
            ORDER BY i.added_at ASC
            ",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(Cart {
            id: Some(cart_id),
            user_id,
            items,
        })
    }
}
