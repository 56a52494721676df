//! HTTP route handlers for the shop API.
//!
//! # Route Structure
//!
//! All routes are nested under `/api`. Successful responses wrap their
//! payload in `{"success": true, "data": ...}`; failures use
//! `{"success": false, "message": ...}` (see [`crate::error::ApiError`]).
//!
//! ```text
//! # Products
//! GET    /api/products                     - Catalog listing (filter + sort)
//! GET    /api/products/{id}                - Product detail
//!
//! # Cart
//! POST   /api/cart/items                   - Add a product to the cart
//! GET    /api/cart/{userId}                - Fetch the user's cart
//! PUT    /api/cart/items                   - Update a line's quantity
//! DELETE /api/cart/{userId}/{productId}    - Remove a line
//!
//! # Addresses
//! POST   /api/addresses                    - Create (max 3 per user)
//! GET    /api/addresses/{userId}           - List
//! PUT    /api/addresses/{userId}/{id}      - Update
//! DELETE /api/addresses/{userId}/{id}      - Delete
//!
//! # Orders
//! POST   /api/orders                       - Place an order (checkout)
//! POST   /api/orders/capture/{id}          - Capture a gateway payment
//! GET    /api/orders/{userId}              - Order history, newest first
//! GET    /api/orders/detail/{id}           - Order detail
//!
//! # Reviews
//! POST   /api/reviews                      - Add a review (purchase-gated)
//! GET    /api/reviews/{productId}          - List a product's reviews
//! ```

pub mod addresses;
pub mod cart;
pub mod orders;
pub mod products;
pub mod reviews;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{delete, get, post, put},
};
use serde::Serialize;

use crate::state::AppState;

/// Success envelope for every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

/// Wrap a payload in the success envelope with `201 Created`.
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// Create the combined API router, nested under `/api` by the caller.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", products_routes())
        .nest("/cart", cart_routes())
        .nest("/addresses", addresses_routes())
        .nest("/orders", orders_routes())
        .nest("/reviews", reviews_routes())
}

fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list))
        .route("/{id}", get(products::detail))
}

fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(cart::add_item).put(cart::update_quantity))
        .route("/{user_id}", get(cart::fetch))
        .route("/{user_id}/{product_id}", delete(cart::remove_item))
}

fn addresses_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(addresses::create))
        .route("/{user_id}", get(addresses::list))
        .route(
            "/{user_id}/{address_id}",
            put(addresses::update).delete(addresses::remove),
        )
}

fn orders_routes() -> Router<AppState> {
    // capture and detail sit under static prefixes so the history route can
    // name its parameter {user_id} without a same-position wildcard clash
    Router::new()
        .route("/", post(orders::place))
        .route("/capture/{id}", post(orders::capture))
        .route("/detail/{id}", get(orders::detail))
        .route("/{user_id}", get(orders::list_for_user))
}

fn reviews_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(reviews::add))
        .route("/{product_id}", get(reviews::list))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Router construction panics on conflicting paths, so building the full
    // route table is itself the assertion.
    #[test]
    fn route_table_has_no_conflicts() {
        let _router = routes();
    }
}
