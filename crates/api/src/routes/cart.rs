//! Cart handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use clementine_core::{ProductId, UserId};

use super::{ApiResponse, ok};
use crate::db::carts::CartRepository;
use crate::error::{ApiError, Result};
use crate::models::Cart;
use crate::state::AppState;

/// Body for adding a product or updating a line's quantity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemBody {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
}

fn require_positive_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(ApiError::Validation(
            "quantity must be at least 1".to_owned(),
        ));
    }
    Ok(())
}

/// `POST /api/cart/items` - add a product to the user's cart.
pub async fn add_item(
    State(state): State<AppState>,
    Json(body): Json<CartItemBody>,
) -> Result<Json<ApiResponse<Cart>>> {
    require_positive_quantity(body.quantity)?;
    let cart = CartRepository::new(state.pool())
        .add_item(body.user_id, body.product_id, body.quantity)
        .await?;
    Ok(ok(cart))
}

/// `GET /api/cart/{userId}` - the user's cart, empty if none exists.
pub async fn fetch(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<Cart>>> {
    let cart = CartRepository::new(state.pool()).fetch(user_id).await?;
    Ok(ok(cart))
}

/// `PUT /api/cart/items` - set a line's quantity.
pub async fn update_quantity(
    State(state): State<AppState>,
    Json(body): Json<CartItemBody>,
) -> Result<Json<ApiResponse<Cart>>> {
    require_positive_quantity(body.quantity)?;
    let cart = CartRepository::new(state.pool())
        .update_quantity(body.user_id, body.product_id, body.quantity)
        .await?;
    Ok(ok(cart))
}

/// `DELETE /api/cart/{userId}/{productId}` - remove a line.
pub async fn remove_item(
    State(state): State<AppState>,
    Path((user_id, product_id)): Path<(UserId, ProductId)>,
) -> Result<Json<ApiResponse<Cart>>> {
    let cart = CartRepository::new(state.pool())
        .remove_item(user_id, product_id)
        .await?;
    Ok(ok(cart))
}
