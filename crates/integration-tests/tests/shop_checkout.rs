//! End-to-end checkout tests.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The API server running (cargo run -p clementine-api)
//!
//! Each test seeds its own product and uses a unique user id, so runs are
//! independent of existing data.

use std::time::{SystemTime, UNIX_EPOCH};

use clementine_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::{Value, json};

/// A user id that will not collide across test runs.
fn fresh_user_id() -> i32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();
    // Keep it positive and clear of seeded data.
    1_000_000 + (nanos % 1_000_000) as i32
}

/// Seed a product directly in the database, returning its id.
async fn seed_product(ctx: &TestContext, title: &str, price: &str, stock: i32) -> i32 {
    let (id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO shop.products (title, description, category, brand, price, total_stock)
        VALUES ($1, '', 'test', 'test', $2::numeric, $3)
        RETURNING id
        ",
    )
    .bind(title)
    .bind(price)
    .bind(stock)
    .fetch_one(&ctx.pool)
    .await
    .expect("failed to seed product");
    id
}

async fn current_stock(ctx: &TestContext, product_id: i32) -> i32 {
    let (stock,): (i32,) = sqlx::query_as("SELECT total_stock FROM shop.products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&ctx.pool)
        .await
        .expect("failed to read stock");
    stock
}

/// Add a product to the user's cart via the API and return the cart id.
async fn add_to_cart(ctx: &TestContext, user_id: i32, product_id: i32, quantity: i32) -> i64 {
    let resp = ctx
        .client
        .post(ctx.url("/api/cart/items"))
        .json(&json!({
            "userId": user_id,
            "productId": product_id,
            "quantity": quantity,
        }))
        .send()
        .await
        .expect("add to cart failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("cart body");
    assert_eq!(body["success"], true);
    body["data"]["id"].as_i64().expect("cart id")
}

fn order_body(user_id: i32, cart_id: i64, product_id: i32, price: &str, quantity: i32) -> Value {
    json!({
        "userId": user_id,
        "cartId": cart_id,
        "cartItems": [{
            "productId": product_id,
            "price": price,
            "quantity": quantity,
        }],
        "addressInfo": {
            "address": "12 Mango Lane",
            "city": "Karachi",
            "pincode": "74200",
            "phone": "03001234567",
        },
        "paymentMethod": "cod",
    })
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn cod_checkout_decrements_stock_and_clears_the_cart() {
    let ctx = TestContext::new().await;
    let user_id = fresh_user_id();
    let product_id = seed_product(&ctx, "Checkout Test Product", "10.00", 5).await;
    let cart_id = add_to_cart(&ctx, user_id, product_id, 2).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&order_body(user_id, cart_id, product_id, "10.00", 2))
        .send()
        .await
        .expect("place order failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = resp.json().await.expect("order body");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["orderStatus"], "confirmed");
    assert_eq!(body["data"]["paymentStatus"], "pending");
    assert_eq!(body["data"]["subtotal"], "20.00");
    assert_eq!(body["data"]["totalAmount"], "220.00");

    // Stock decremented in the database
    assert_eq!(current_stock(&ctx, product_id).await, 3);

    // Cart is gone: fetching returns an empty cart
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/cart/{user_id}")))
        .send()
        .await
        .expect("fetch cart failed");
    let cart: Value = resp.json().await.expect("cart body");
    assert_eq!(cart["data"]["items"].as_array().expect("items").len(), 0);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn oversized_order_is_rejected_without_touching_stock() {
    let ctx = TestContext::new().await;
    let user_id = fresh_user_id();
    let product_id = seed_product(&ctx, "Scarce Product", "10.00", 1).await;
    let cart_id = add_to_cart(&ctx, user_id, product_id, 1).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&order_body(user_id, cart_id, product_id, "10.00", 3))
        .send()
        .await
        .expect("place order failed");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = resp.json().await.expect("error body");
    assert_eq!(body["success"], false);
    assert!(
        body["message"]
            .as_str()
            .expect("message")
            .contains("Scarce Product")
    );

    assert_eq!(current_stock(&ctx, product_id).await, 1);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn gateway_checkout_reserves_nothing_until_capture() {
    let ctx = TestContext::new().await;
    let user_id = fresh_user_id();
    let product_id = seed_product(&ctx, "Gateway Product", "250.00", 4).await;
    let cart_id = add_to_cart(&ctx, user_id, product_id, 1).await;

    let mut body = order_body(user_id, cart_id, product_id, "250.00", 1);
    body["paymentMethod"] = json!("payfast");

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&body)
        .send()
        .await
        .expect("place order failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let placed: Value = resp.json().await.expect("order body");
    assert_eq!(placed["data"]["orderStatus"], "pending");
    assert_eq!(placed["data"]["paymentStatus"], "unpaid");
    // Signed gateway fields accompany the order
    assert!(placed["data"]["payment"]["secureHash"].is_string());
    assert_eq!(current_stock(&ctx, product_id).await, 4);

    let order_id = placed["data"]["id"].as_i64().expect("order id");
    let resp = ctx
        .client
        .post(ctx.url(&format!("/api/orders/capture/{order_id}")))
        .json(&json!({ "paymentId": "PF-123", "payerId": "PAYER-1" }))
        .send()
        .await
        .expect("capture failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let captured: Value = resp.json().await.expect("capture body");
    assert_eq!(captured["data"]["orderStatus"], "confirmed");
    assert_eq!(captured["data"]["paymentStatus"], "paid");
    assert_eq!(current_stock(&ctx, product_id).await, 3);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn order_history_lists_the_placed_order() {
    let ctx = TestContext::new().await;
    let user_id = fresh_user_id();
    let product_id = seed_product(&ctx, "History Product", "15.00", 10).await;
    let cart_id = add_to_cart(&ctx, user_id, product_id, 1).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&order_body(user_id, cart_id, product_id, "15.00", 1))
        .send()
        .await
        .expect("place order failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/orders/{user_id}")))
        .send()
        .await
        .expect("order history failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("history body");
    let orders = body["data"].as_array().expect("orders");
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["items"][0]["title"], "History Product");
}
