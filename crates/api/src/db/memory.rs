//! In-memory checkout and review store.
//!
//! Mirrors the Postgres semantics exactly (all-or-nothing placement,
//! idempotent capture, the purchase gate) so the service-level tests can
//! exercise the full workflow without a database.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};

use clementine_core::{
    CartId, OrderId, OrderStatus, PaymentStatus, Price, ProductId, ReviewId, UserId,
};

use super::StoreError;
use crate::models::{NewOrder, NewReview, Order, OrderItem, PaymentCapture, Product, Review};
use crate::services::checkout::CheckoutStore;
use crate::services::review::ReviewStore;

#[derive(Default)]
struct Inner {
    products: BTreeMap<i32, Product>,
    /// cart id -> owning user
    carts: BTreeMap<i32, UserId>,
    orders: BTreeMap<i32, Order>,
    reviews: Vec<Review>,
    next_id: i32,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory store, safe to share across tasks.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a product with the given list price and stock.
    ///
    /// Panics if `price` is not a valid decimal; intended for test setup.
    #[allow(clippy::unwrap_used)]
    #[must_use]
    pub fn insert_product(&self, title: &str, price: &str, total_stock: i32) -> ProductId {
        let mut inner = self.lock();
        let id = ProductId::new(inner.next_id());
        inner.products.insert(
            id.as_i32(),
            Product {
                id,
                title: title.to_owned(),
                description: String::new(),
                category: String::new(),
                brand: String::new(),
                image: None,
                price: price.parse().unwrap(),
                sale_price: None,
                total_stock,
                average_review: None,
            },
        );
        id
    }

    /// Create a cart for the user.
    #[must_use]
    pub fn insert_cart(&self, user_id: UserId) -> CartId {
        let mut inner = self.lock();
        let id = CartId::new(inner.next_id());
        inner.carts.insert(id.as_i32(), user_id);
        id
    }

    /// Snapshot of a product, if it exists.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.lock().products.get(&id.as_i32()).cloned()
    }

    /// Whether the cart still exists.
    #[must_use]
    pub fn cart_exists(&self, id: CartId) -> bool {
        self.lock().carts.contains_key(&id.as_i32())
    }

    /// Number of placed orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    /// Overwrite a product's stock counter.
    pub fn set_stock(&self, id: ProductId, total_stock: i32) {
        if let Some(product) = self.lock().products.get_mut(&id.as_i32()) {
            product.total_stock = total_stock;
        }
    }

    /// Overwrite a product's list price.
    pub fn set_price(&self, id: ProductId, price: Price) {
        if let Some(product) = self.lock().products.get_mut(&id.as_i32()) {
            product.price = price;
        }
    }
}

fn aggregate(items: &[OrderItem]) -> BTreeMap<i32, i32> {
    let mut quantities: BTreeMap<i32, i32> = BTreeMap::new();
    for item in items {
        *quantities.entry(item.product_id.as_i32()).or_insert(0) += item.quantity;
    }
    quantities
}

/// Verify stock for every aggregated quantity without mutating anything.
fn check_stock(inner: &Inner, quantities: &BTreeMap<i32, i32>) -> Result<(), StoreError> {
    for (&product_id, &requested) in quantities {
        let product = inner
            .products
            .get(&product_id)
            .ok_or(StoreError::ProductNotFound(ProductId::new(product_id)))?;
        if requested > product.total_stock {
            return Err(StoreError::InsufficientStock {
                product_id: ProductId::new(product_id),
                title: product.title.clone(),
                available: product.total_stock,
                requested,
            });
        }
    }
    Ok(())
}

fn decrement_stock(inner: &mut Inner, quantities: &BTreeMap<i32, i32>) {
    for (&product_id, &quantity) in quantities {
        if let Some(product) = inner.products.get_mut(&product_id) {
            product.total_stock -= quantity;
        }
    }
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut inner = self.lock();

        if !inner.carts.contains_key(&order.cart_id.as_i32()) {
            return Err(StoreError::CartNotFound);
        }

        let mut quantities: BTreeMap<i32, i32> = BTreeMap::new();
        for line in &order.lines {
            *quantities.entry(line.product_id.as_i32()).or_insert(0) += line.quantity;
        }
        check_stock(&inner, &quantities)?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            let product = inner
                .products
                .get(&line.product_id.as_i32())
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            let item = line
                .into_item(product.title.clone(), product.image.clone())
                .ok_or_else(|| StoreError::Conflict("order line total overflowed".to_owned()))?;
            items.push(item);
        }

        let now = Utc::now();
        let id = OrderId::new(inner.next_id());
        let placed = Order {
            id,
            user_id: order.user_id,
            cart_id: order.cart_id,
            items,
            address_info: order.address_info,
            order_status: order.order_status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            subtotal: order.subtotal,
            shipping_fee: order.shipping_fee,
            total_amount: order.total_amount,
            payment_id: None,
            payer_id: None,
            order_date: now,
            order_update_date: now,
        };

        if placed.order_status == OrderStatus::Confirmed {
            decrement_stock(&mut inner, &quantities);
            inner.carts.remove(&placed.cart_id.as_i32());
        }

        inner.orders.insert(id.as_i32(), placed.clone());
        Ok(placed)
    }

    async fn capture_payment(
        &self,
        order_id: OrderId,
        capture: PaymentCapture,
    ) -> Result<Order, StoreError> {
        let mut inner = self.lock();

        let order = inner
            .orders
            .get(&order_id.as_i32())
            .cloned()
            .ok_or(StoreError::OrderNotFound(order_id))?;

        if order.payment_status == PaymentStatus::Paid
            || order.order_status == OrderStatus::Confirmed
        {
            return Ok(order);
        }

        let quantities = aggregate(&order.items);
        check_stock(&inner, &quantities)?;
        decrement_stock(&mut inner, &quantities);
        inner.carts.remove(&order.cart_id.as_i32());

        let mut captured = order;
        captured.order_status = OrderStatus::Confirmed;
        captured.payment_status = PaymentStatus::Paid;
        captured.payment_id = Some(capture.payment_id);
        captured.payer_id = Some(capture.payer_id);
        captured.order_update_date = Utc::now();
        inner.orders.insert(order_id.as_i32(), captured.clone());
        Ok(captured)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.get(&id.as_i32()).cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let inner = self.lock();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.reverse();
        Ok(orders)
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn review_exists(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .any(|r| r.product_id == product_id && r.user_id == user_id))
    }

    async fn has_qualifying_purchase(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<bool, StoreError> {
        Ok(self.lock().orders.values().any(|order| {
            order.user_id == user_id
                && order.order_status.qualifies_for_review()
                && order.items.iter().any(|item| item.product_id == product_id)
        }))
    }

    async fn insert_review(&self, review: NewReview) -> Result<Review, StoreError> {
        let mut inner = self.lock();

        if !inner.products.contains_key(&review.product_id.as_i32()) {
            return Err(StoreError::ProductNotFound(review.product_id));
        }
        if inner
            .reviews
            .iter()
            .any(|r| r.product_id == review.product_id && r.user_id == review.user_id)
        {
            return Err(StoreError::DuplicateReview);
        }

        let id = ReviewId::new(inner.next_id());
        let saved = Review {
            id,
            product_id: review.product_id,
            user_id: review.user_id,
            user_name: review.user_name,
            review_message: review.review_message,
            review_value: review.review_value,
            created_at: Utc::now(),
        };
        inner.reviews.push(saved.clone());

        let (sum, count) = inner
            .reviews
            .iter()
            .filter(|r| r.product_id == review.product_id)
            .fold((0i64, 0i64), |(s, c), r| (s + i64::from(r.review_value), c + 1));
        // Postgres ROUND rounds midpoints away from zero, not to even
        let average = (Decimal::from(sum) / Decimal::from(count))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        if let Some(product) = inner.products.get_mut(&review.product_id.as_i32()) {
            product.average_review = Some(average);
        }

        Ok(saved)
    }

    async fn reviews_for_product(&self, product_id: ProductId) -> Result<Vec<Review>, StoreError> {
        let mut reviews: Vec<Review> = self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.reverse();
        Ok(reviews)
    }
}
