//! The checkout workflow: validation, totals, and atomic order placement.
//!
//! Placement is all-or-nothing: the store re-validates stock for every line
//! against live product rows, persists the order snapshot, and - for orders
//! that start confirmed (cash on delivery) - decrements stock and deletes
//! the cart, all inside one transaction. Gateway orders reserve nothing at
//! placement; [`capture_payment`] performs the decrement and cart deletion
//! once the gateway confirms.
//!
//! Transient transaction failures (write conflicts, deadlocks) are retried
//! a bounded number of times before being surfaced to the caller.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use clementine_core::{CartId, OrderId, PaymentMethod, Price, ProductId, UserId};

use crate::db::StoreError;
use crate::models::{AddressSnapshot, NewOrder, Order, OrderLine, PaymentCapture};

/// Bounded retry budget for transient transaction conflicts.
const MAX_TRANSACTION_ATTEMPTS: u32 = 3;

/// Storage seam for the checkout workflow.
///
/// Implementations must apply [`CheckoutStore::place_order`] and
/// [`CheckoutStore::capture_payment`] atomically: either every effect
/// (order row, stock decrements, cart deletion) persists, or none do.
#[async_trait]
pub trait CheckoutStore: Send + Sync {
    /// Atomically persist a validated order.
    ///
    /// Re-validates stock for every line; when the order starts confirmed,
    /// also decrements stock and deletes the cart.
    async fn place_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Atomically capture payment for a gateway order.
    ///
    /// Idempotent: an order that is already paid or confirmed is returned
    /// unchanged. Otherwise re-validates stock, decrements it, deletes the
    /// cart, records the payment identifiers, and confirms the order.
    async fn capture_payment(
        &self,
        order_id: OrderId,
        capture: PaymentCapture,
    ) -> Result<Order, StoreError>;

    /// Fetch one order.
    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Fetch a user's orders, newest first.
    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;
}

/// Checkout failure.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request was rejected before any side effect; every problem found
    /// is listed.
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// The store failed (insufficient stock, not found, transient, ...).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Order placement request body (camelCase wire form).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub user_id: UserId,
    pub cart_id: CartId,
    #[serde(default)]
    pub cart_items: Vec<CartItemInput>,
    pub address_info: Option<AddressInfoInput>,
    #[serde(default)]
    pub payment_method: String,
    /// Optional client-computed totals; verified against server values.
    pub subtotal: Option<Price>,
    pub shipping_fee: Option<Price>,
    pub total_amount: Option<Price>,
}

/// One submitted cart line. Fields are optional so validation can report
/// every missing piece instead of failing at deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemInput {
    pub product_id: Option<ProductId>,
    pub price: Option<Price>,
    pub quantity: Option<i32>,
}

/// Submitted shipping address.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInfoInput {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default)]
    pub phone: String,
    pub notes: Option<String>,
}

/// Place an order.
///
/// Validation is fail-fast with no side effects; the atomic apply is
/// delegated to the store and retried on transient conflicts.
///
/// # Errors
///
/// `CheckoutError::Validation` listing every rejected field, or the
/// underlying `StoreError` (insufficient stock, unknown product/cart,
/// transient failure after retries exhaust).
pub async fn place_order<S>(
    store: &S,
    request: PlaceOrderRequest,
    default_shipping_fee: Price,
) -> Result<Order, CheckoutError>
where
    S: CheckoutStore + ?Sized,
{
    let new_order = build_order(&request, default_shipping_fee)?;

    let mut attempt = 1;
    loop {
        match store.place_order(new_order.clone()).await {
            Err(StoreError::Transient(reason)) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                tracing::warn!(attempt, %reason, "order placement conflict, retrying");
                attempt += 1;
            }
            other => return other.map_err(CheckoutError::Store),
        }
    }
}

/// Capture a gateway payment for an order.
///
/// # Errors
///
/// `CheckoutError::Validation` when the payment identifiers are missing;
/// otherwise the underlying `StoreError` (unknown order, insufficient
/// stock - in which case the order stays pending/unpaid).
pub async fn capture_payment<S>(
    store: &S,
    order_id: OrderId,
    capture: PaymentCapture,
) -> Result<Order, CheckoutError>
where
    S: CheckoutStore + ?Sized,
{
    let mut errors = Vec::new();
    if capture.payment_id.trim().is_empty() {
        errors.push("paymentId is required".to_owned());
    }
    if capture.payer_id.trim().is_empty() {
        errors.push("payerId is required".to_owned());
    }
    if !errors.is_empty() {
        return Err(CheckoutError::Validation(errors));
    }

    let mut attempt = 1;
    loop {
        match store.capture_payment(order_id, capture.clone()).await {
            Err(StoreError::Transient(reason)) if attempt < MAX_TRANSACTION_ATTEMPTS => {
                tracing::warn!(attempt, %reason, "payment capture conflict, retrying");
                attempt += 1;
            }
            other => return other.map_err(CheckoutError::Store),
        }
    }
}

/// Validate the request and assemble a [`NewOrder`].
///
/// Collects every problem into one error list (rather than failing on the
/// first), so the client gets actionable detail before any write happens.
fn build_order(
    request: &PlaceOrderRequest,
    default_shipping_fee: Price,
) -> Result<NewOrder, CheckoutError> {
    let mut errors = Vec::new();

    let payment_method = if request.payment_method.trim().is_empty() {
        errors.push("paymentMethod is required".to_owned());
        None
    } else {
        match request.payment_method.parse::<PaymentMethod>() {
            Ok(method) => Some(method),
            Err(_) => {
                errors.push(format!(
                    "paymentMethod \"{}\" is not supported (expected one of: cod, payfast)",
                    request.payment_method
                ));
                None
            }
        }
    };

    if request.cart_items.is_empty() {
        errors.push("cartItems must not be empty".to_owned());
    }

    let mut lines = Vec::with_capacity(request.cart_items.len());
    for (index, item) in request.cart_items.iter().enumerate() {
        let mut valid = true;

        if item.product_id.is_none() {
            errors.push(format!("cartItems[{index}].productId is required"));
            valid = false;
        }
        match item.quantity {
            None => {
                errors.push(format!("cartItems[{index}].quantity is required"));
                valid = false;
            }
            Some(quantity) if quantity < 1 => {
                errors.push(format!("cartItems[{index}].quantity must be at least 1"));
                valid = false;
            }
            Some(_) => {}
        }
        match item.price {
            None => {
                errors.push(format!("cartItems[{index}].price is required"));
                valid = false;
            }
            Some(price) if price.is_negative() => {
                errors.push(format!("cartItems[{index}].price must not be negative"));
                valid = false;
            }
            Some(_) => {}
        }

        if valid
            && let (Some(product_id), Some(price), Some(quantity)) =
                (item.product_id, item.price, item.quantity)
        {
            lines.push(OrderLine {
                product_id,
                price,
                quantity,
            });
        }
    }

    let address_info = match &request.address_info {
        None => {
            errors.push("addressInfo is required".to_owned());
            None
        }
        Some(address) => {
            let mut missing = Vec::new();
            for (value, field) in [
                (&address.address, "address"),
                (&address.city, "city"),
                (&address.pincode, "pincode"),
                (&address.phone, "phone"),
            ] {
                if value.trim().is_empty() {
                    missing.push(field);
                }
            }
            if missing.is_empty() {
                Some(AddressSnapshot {
                    address: address.address.clone(),
                    city: address.city.clone(),
                    pincode: address.pincode.clone(),
                    phone: address.phone.clone(),
                    notes: address.notes.clone(),
                })
            } else {
                for field in missing {
                    errors.push(format!("addressInfo.{field} is required"));
                }
                None
            }
        }
    };

    let shipping_fee = request.shipping_fee.unwrap_or(default_shipping_fee);
    if shipping_fee.is_negative() {
        errors.push("shippingFee must not be negative".to_owned());
    }

    // Totals are only meaningful once every line validated.
    let mut subtotal = Price::ZERO;
    if lines.len() == request.cart_items.len() && !lines.is_empty() {
        let computed = lines.iter().try_fold(Price::ZERO, |acc, line| {
            line.price
                .checked_mul_quantity(line.quantity)
                .and_then(|line_total| acc.checked_add(line_total))
        });
        match computed {
            Some(value) => subtotal = value,
            None => errors.push("order total overflows".to_owned()),
        }

        if let Some(claimed) = request.subtotal
            && claimed != subtotal
        {
            errors.push(format!(
                "subtotal mismatch: client sent {claimed}, server computed {subtotal}"
            ));
        }
    }

    let total_amount = match subtotal.checked_add(shipping_fee) {
        Some(total) => total,
        None => {
            errors.push("order total overflows".to_owned());
            Price::ZERO
        }
    };
    if errors.is_empty()
        && let Some(claimed) = request.total_amount
        && claimed != total_amount
    {
        errors.push(format!(
            "totalAmount mismatch: client sent {claimed}, server computed {total_amount}"
        ));
    }

    if !errors.is_empty() {
        return Err(CheckoutError::Validation(errors));
    }

    // Validation guarantees these are present past this point.
    let (payment_method, address_info) = match (payment_method, address_info) {
        (Some(method), Some(address)) => (method, address),
        _ => return Err(CheckoutError::Validation(vec!["invalid request".to_owned()])),
    };
    let (order_status, payment_status) = payment_method.initial_statuses();

    Ok(NewOrder {
        user_id: request.user_id,
        cart_id: request.cart_id,
        lines,
        address_info,
        order_status,
        payment_method,
        payment_status,
        subtotal,
        shipping_fee,
        total_amount,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clementine_core::{OrderStatus, PaymentStatus};

    use super::*;
    use crate::db::memory::MemoryStore;

    fn address() -> AddressInfoInput {
        AddressInfoInput {
            address: "12 Mango Lane".to_owned(),
            city: "Karachi".to_owned(),
            pincode: "74200".to_owned(),
            phone: "03001234567".to_owned(),
            notes: None,
        }
    }

    fn item(product_id: ProductId, price: &str, quantity: i32) -> CartItemInput {
        CartItemInput {
            product_id: Some(product_id),
            price: Some(price.parse().unwrap()),
            quantity: Some(quantity),
        }
    }

    fn request(
        cart_id: CartId,
        items: Vec<CartItemInput>,
        payment_method: &str,
    ) -> PlaceOrderRequest {
        PlaceOrderRequest {
            user_id: UserId::new(1),
            cart_id,
            cart_items: items,
            address_info: Some(address()),
            payment_method: payment_method.to_owned(),
            subtotal: None,
            shipping_fee: None,
            total_amount: None,
        }
    }

    const SHIPPING: Price = Price::ZERO;

    fn fee() -> Price {
        Price::from(200)
    }

    #[tokio::test]
    async fn cod_checkout_decrements_stock_and_deletes_cart() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));

        let order = place_order(&store, request(cart, vec![item(p1, "10", 2)], "cod"), fee())
            .await
            .unwrap();

        assert_eq!(order.subtotal, Price::from(20));
        assert_eq!(order.total_amount, Price::from(220));
        assert_eq!(order.order_status, OrderStatus::Confirmed);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(store.product(p1).unwrap().total_stock, 3);
        assert!(!store.cart_exists(cart));
    }

    #[tokio::test]
    async fn insufficient_stock_names_product_and_mutates_nothing() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));

        let err = place_order(&store, request(cart, vec![item(p1, "10", 10)], "cod"), fee())
            .await
            .unwrap_err();

        match err {
            CheckoutError::Store(StoreError::InsufficientStock {
                title,
                available,
                requested,
                ..
            }) => {
                assert_eq!(title, "P1");
                assert_eq!(available, 5);
                assert_eq!(requested, 10);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.product(p1).unwrap().total_stock, 5);
        assert!(store.cart_exists(cart));
        assert!(store.order_count() == 0);
    }

    #[tokio::test]
    async fn one_bad_line_aborts_the_whole_order() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let p2 = store.insert_product("P2", "4", 1);
        let cart = store.insert_cart(UserId::new(1));

        let err = place_order(
            &store,
            request(cart, vec![item(p1, "10", 2), item(p2, "4", 3)], "cod"),
            fee(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Store(StoreError::InsufficientStock { .. })
        ));
        // zero products mutated, zero orders created
        assert_eq!(store.product(p1).unwrap().total_stock, 5);
        assert_eq!(store.product(p2).unwrap().total_stock, 1);
        assert_eq!(store.order_count(), 0);
        assert!(store.cart_exists(cart));
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let store = MemoryStore::new();
        let cart = store.insert_cart(UserId::new(1));
        let ghost = ProductId::new(999);

        let err = place_order(&store, request(cart, vec![item(ghost, "1", 1)], "cod"), fee())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::Store(StoreError::ProductNotFound(id)) if id == ghost
        ));
    }

    #[tokio::test]
    async fn gateway_order_reserves_no_stock_at_placement() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));

        let order = place_order(
            &store,
            request(cart, vec![item(p1, "10", 2)], "payfast"),
            fee(),
        )
        .await
        .unwrap();

        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Unpaid);
        assert_eq!(store.product(p1).unwrap().total_stock, 5);
        assert!(store.cart_exists(cart));
    }

    #[tokio::test]
    async fn capture_confirms_decrements_and_deletes_cart() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));
        let order = place_order(
            &store,
            request(cart, vec![item(p1, "10", 2)], "payfast"),
            fee(),
        )
        .await
        .unwrap();

        let capture = PaymentCapture {
            payment_id: "PAY-1".to_owned(),
            payer_id: "PAYER-1".to_owned(),
        };
        let captured = capture_payment(&store, order.id, capture).await.unwrap();

        assert_eq!(captured.order_status, OrderStatus::Confirmed);
        assert_eq!(captured.payment_status, PaymentStatus::Paid);
        assert_eq!(captured.payment_id.as_deref(), Some("PAY-1"));
        assert_eq!(store.product(p1).unwrap().total_stock, 3);
        assert!(!store.cart_exists(cart));
    }

    #[tokio::test]
    async fn capture_is_idempotent() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));
        let order = place_order(
            &store,
            request(cart, vec![item(p1, "10", 2)], "payfast"),
            fee(),
        )
        .await
        .unwrap();

        let capture = PaymentCapture {
            payment_id: "PAY-1".to_owned(),
            payer_id: "PAYER-1".to_owned(),
        };
        capture_payment(&store, order.id, capture.clone())
            .await
            .unwrap();
        let second = capture_payment(&store, order.id, capture).await.unwrap();

        // no double decrement
        assert_eq!(second.order_status, OrderStatus::Confirmed);
        assert_eq!(store.product(p1).unwrap().total_stock, 3);
    }

    #[tokio::test]
    async fn failed_capture_leaves_order_pending_unpaid() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));
        let order = place_order(
            &store,
            request(cart, vec![item(p1, "10", 4)], "payfast"),
            fee(),
        )
        .await
        .unwrap();

        // another checkout drains the stock in the window before capture
        store.set_stock(p1, 1);

        let capture = PaymentCapture {
            payment_id: "PAY-1".to_owned(),
            payer_id: "PAYER-1".to_owned(),
        };
        let err = capture_payment(&store, order.id, capture).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Store(StoreError::InsufficientStock { .. })
        ));

        let unchanged = store.order(order.id).await.unwrap().unwrap();
        assert_eq!(unchanged.order_status, OrderStatus::Pending);
        assert_eq!(unchanged.payment_status, PaymentStatus::Unpaid);
        assert_eq!(store.product(p1).unwrap().total_stock, 1);
    }

    #[tokio::test]
    async fn concurrent_checkouts_for_last_units_have_one_winner() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let p1 = store.insert_product("P1", "10", 5);
        let cart_a = store.insert_cart(UserId::new(1));
        let cart_b = store.insert_cart(UserId::new(2));

        let mut req_a = request(cart_a, vec![item(p1, "10", 3)], "cod");
        req_a.user_id = UserId::new(1);
        let mut req_b = request(cart_b, vec![item(p1, "10", 3)], "cod");
        req_b.user_id = UserId::new(2);

        let store_a = std::sync::Arc::clone(&store);
        let store_b = std::sync::Arc::clone(&store);
        let (a, b) = tokio::join!(
            tokio::spawn(async move { place_order(store_a.as_ref(), req_a, fee()).await }),
            tokio::spawn(async move { place_order(store_b.as_ref(), req_b, fee()).await }),
        );
        let results = [a.unwrap(), b.unwrap()];

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(CheckoutError::Store(StoreError::InsufficientStock { .. }))
        )));
        assert_eq!(store.product(p1).unwrap().total_stock, 2);
    }

    #[tokio::test]
    async fn snapshot_is_immune_to_later_price_edits() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));
        let order = place_order(&store, request(cart, vec![item(p1, "10", 2)], "cod"), fee())
            .await
            .unwrap();

        store.set_price(p1, "99".parse().unwrap());

        let fetched = store.order(order.id).await.unwrap().unwrap();
        let line = fetched.items.first().unwrap();
        assert_eq!(line.price, Price::from(10));
        assert_eq!(line.total_price, Price::from(20));
    }

    #[tokio::test]
    async fn validation_collects_every_problem() {
        let store = MemoryStore::new();
        let bad = PlaceOrderRequest {
            user_id: UserId::new(1),
            cart_id: CartId::new(1),
            cart_items: vec![CartItemInput {
                product_id: None,
                price: Some("-1".parse().unwrap()),
                quantity: Some(0),
            }],
            address_info: Some(AddressInfoInput {
                address: String::new(),
                ..address()
            }),
            payment_method: "cheque".to_owned(),
            subtotal: None,
            shipping_fee: None,
            total_amount: None,
        };

        let err = place_order(&store, bad, fee()).await.unwrap_err();
        let CheckoutError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.contains("paymentMethod")));
        assert!(errors.iter().any(|e| e.contains("productId")));
        assert!(errors.iter().any(|e| e.contains("quantity")));
        assert!(errors.iter().any(|e| e.contains("price")));
        assert!(errors.iter().any(|e| e.contains("addressInfo.address")));
        assert_eq!(store.order_count(), 0);
    }

    #[tokio::test]
    async fn client_total_mismatch_is_rejected() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));

        let mut req = request(cart, vec![item(p1, "10", 2)], "cod");
        req.subtotal = Some(Price::from(25));
        let err = place_order(&store, req, fee()).await.unwrap_err();
        let CheckoutError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.iter().any(|e| e.contains("subtotal mismatch")));
    }

    #[tokio::test]
    async fn client_shipping_fee_overrides_default() {
        let store = MemoryStore::new();
        let p1 = store.insert_product("P1", "10", 5);
        let cart = store.insert_cart(UserId::new(1));

        let mut req = request(cart, vec![item(p1, "10", 2)], "cod");
        req.shipping_fee = Some(SHIPPING);
        let order = place_order(&store, req, fee()).await.unwrap();
        assert_eq!(order.total_amount, Price::from(20));
    }

    #[tokio::test]
    async fn capture_requires_payment_identifiers() {
        let store = MemoryStore::new();
        let err = capture_payment(
            &store,
            OrderId::new(1),
            PaymentCapture {
                payment_id: String::new(),
                payer_id: "  ".to_owned(),
            },
        )
        .await
        .unwrap_err();
        let CheckoutError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 2);
    }

    #[tokio::test]
    async fn capture_of_unknown_order_is_not_found() {
        let store = MemoryStore::new();
        let err = capture_payment(
            &store,
            OrderId::new(404),
            PaymentCapture {
                payment_id: "PAY-1".to_owned(),
                payer_id: "PAYER-1".to_owned(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::Store(StoreError::OrderNotFound(_))
        ));
    }
}
