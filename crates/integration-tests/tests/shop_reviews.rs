//! Review gate tests.
//!
//! Require a running API server and database; see `shop_checkout.rs`.

use std::time::{SystemTime, UNIX_EPOCH};

use clementine_integration_tests::TestContext;
use reqwest::StatusCode;
use serde_json::{Value, json};

fn fresh_user_id() -> i32 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .subsec_nanos();
    2_000_000 + (nanos % 1_000_000) as i32
}

async fn seed_product(ctx: &TestContext, title: &str) -> i32 {
    let (id,): (i32,) = sqlx::query_as(
        r"
        INSERT INTO shop.products (title, description, category, brand, price, total_stock)
        VALUES ($1, '', 'test', 'test', 20.00, 10)
        RETURNING id
        ",
    )
    .bind(title)
    .fetch_one(&ctx.pool)
    .await
    .expect("failed to seed product");
    id
}

/// Place a confirmed COD order for the product so the user qualifies.
async fn purchase(ctx: &TestContext, user_id: i32, product_id: i32) {
    let resp = ctx
        .client
        .post(ctx.url("/api/cart/items"))
        .json(&json!({ "userId": user_id, "productId": product_id, "quantity": 1 }))
        .send()
        .await
        .expect("add to cart failed");
    let cart: Value = resp.json().await.expect("cart body");
    let cart_id = cart["data"]["id"].as_i64().expect("cart id");

    let resp = ctx
        .client
        .post(ctx.url("/api/orders"))
        .json(&json!({
            "userId": user_id,
            "cartId": cart_id,
            "cartItems": [{ "productId": product_id, "price": "20.00", "quantity": 1 }],
            "addressInfo": {
                "address": "12 Mango Lane",
                "city": "Karachi",
                "pincode": "74200",
                "phone": "03001234567",
            },
            "paymentMethod": "cod",
        }))
        .send()
        .await
        .expect("place order failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
}

fn review_body(user_id: i32, product_id: i32, value: i32) -> Value {
    json!({
        "productId": product_id,
        "userId": user_id,
        "userName": "Integration Tester",
        "reviewMessage": "Arrived quickly, works great",
        "reviewValue": value,
    })
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn review_without_purchase_is_forbidden() {
    let ctx = TestContext::new().await;
    let user_id = fresh_user_id();
    let product_id = seed_product(&ctx, "Ungated Product").await;

    let resp = ctx
        .client
        .post(ctx.url("/api/reviews"))
        .json(&review_body(user_id, product_id, 5))
        .send()
        .await
        .expect("review request failed");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running API server and database"]
async fn purchased_product_gets_one_review_and_a_cached_average() {
    let ctx = TestContext::new().await;
    let user_id = fresh_user_id();
    let product_id = seed_product(&ctx, "Reviewed Product").await;
    purchase(&ctx, user_id, product_id).await;

    let resp = ctx
        .client
        .post(ctx.url("/api/reviews"))
        .json(&review_body(user_id, product_id, 4))
        .send()
        .await
        .expect("review request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);

    // The cached average is refreshed with the insert
    let (average,): (Option<sqlx::types::Decimal>,) =
        sqlx::query_as("SELECT average_review FROM shop.products WHERE id = $1")
            .bind(product_id)
            .fetch_one(&ctx.pool)
            .await
            .expect("failed to read average");
    assert_eq!(average.expect("average").to_string(), "4.00");

    // A second review from the same user is rejected
    let resp = ctx
        .client
        .post(ctx.url("/api/reviews"))
        .json(&review_body(user_id, product_id, 5))
        .send()
        .await
        .expect("review request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Listing returns the single review
    let resp = ctx
        .client
        .get(ctx.url(&format!("/api/reviews/{product_id}")))
        .send()
        .await
        .expect("review listing failed");
    let body: Value = resp.json().await.expect("listing body");
    assert_eq!(body["data"].as_array().expect("reviews").len(), 1);
    assert_eq!(body["data"][0]["reviewValue"], 4);
}
