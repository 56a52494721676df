//! Checkout and order history handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use clementine_core::{OrderId, PaymentMethod, UserId};

use super::{ApiResponse, created, ok};
use crate::error::{ApiError, Result};
use crate::models::{Order, PaymentCapture};
use crate::services::checkout::{self, CheckoutStore, PlaceOrderRequest};
use crate::services::payment::PaymentRequest;
use crate::state::AppState;

/// A placed order plus, for gateway orders, the signed checkout fields the
/// frontend posts to PayFast.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    #[serde(flatten)]
    pub order: Order,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentRequest>,
}

/// `POST /api/orders` - place an order.
#[instrument(skip(state, request))]
pub async fn place(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PlacedOrder>>)> {
    let order =
        checkout::place_order(state.store(), request, state.config().shipping_fee).await?;

    let payment = (order.payment_method == PaymentMethod::Payfast).then(|| {
        state
            .payfast()
            .payment_request(order.total_amount, &order.id.as_i32().to_string())
    });

    Ok(created(PlacedOrder { order, payment }))
}

/// `POST /api/orders/capture/{id}` - capture a gateway payment.
#[instrument(skip(state, capture))]
pub async fn capture(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Json(capture): Json<PaymentCapture>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = checkout::capture_payment(state.store(), order_id, capture).await?;
    Ok(ok(order))
}

/// `GET /api/orders/{userId}` - the user's order history, newest first.
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.store().orders_for_user(user_id).await?;
    Ok(ok(orders))
}

/// `GET /api/orders/detail/{id}` - a single order.
pub async fn detail(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state
        .store()
        .order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("order {order_id}")))?;
    Ok(ok(order))
}
