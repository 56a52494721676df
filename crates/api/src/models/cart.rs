//! Cart domain types.

use serde::Serialize;

use clementine_core::{CartId, Price, ProductId, UserId};

/// A user's pending cart with its line items.
///
/// `id` is `None` when the user has never carted anything; fetching does not
/// create a row, so there is no real id to report yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Option<CartId>,
    pub user_id: UserId,
    pub items: Vec<CartLine>,
}

/// A cart line item joined with live product data.
///
/// `price_snapshot` is the effective price at the time the item was added;
/// `price`/`sale_price` reflect the product row as of the fetch so clients
/// can surface price changes before checkout.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub title: String,
    pub image: Option<String>,
    pub price: Price,
    pub sale_price: Option<Price>,
    pub price_snapshot: Price,
    pub quantity: i32,
}
