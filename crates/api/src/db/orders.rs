//! Postgres implementation of the checkout store.
//!
//! Both transactions lock the product rows they touch with
//! `SELECT ... FOR UPDATE` in ascending id order, so two concurrent
//! checkouts contending for the same products serialize instead of
//! deadlocking. Stock decrements are additionally guarded by
//! `total_stock >= $n` so the non-negative invariant holds even if a
//! statement slips past the lock.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgConnection, Postgres, Transaction};

use clementine_core::{CartId, OrderId, OrderStatus, PaymentStatus, Price, ProductId, UserId};

use super::{PgStore, StoreError};
use crate::models::{AddressSnapshot, NewOrder, Order, OrderItem, PaymentCapture};
use crate::services::checkout::CheckoutStore;

const ORDER_COLUMNS: &str = "id, user_id, cart_id, items, address_info, \
     order_status, payment_method, payment_status, \
     subtotal, shipping_fee, total_amount, \
     payment_id, payer_id, order_date, order_update_date";

/// Raw order row; statuses are TEXT in the database and parsed on read.
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    cart_id: CartId,
    items: Json<Vec<OrderItem>>,
    address_info: Json<AddressSnapshot>,
    order_status: String,
    payment_method: String,
    payment_status: String,
    subtotal: Price,
    shipping_fee: Price,
    total_amount: Price,
    payment_id: Option<String>,
    payer_id: Option<String>,
    order_date: DateTime<Utc>,
    order_update_date: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, StoreError> {
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            cart_id: self.cart_id,
            items: self.items.0,
            address_info: self.address_info.0,
            order_status: self.order_status.parse().map_err(StoreError::DataCorruption)?,
            payment_method: self
                .payment_method
                .parse()
                .map_err(StoreError::DataCorruption)?,
            payment_status: self
                .payment_status
                .parse()
                .map_err(StoreError::DataCorruption)?,
            subtotal: self.subtotal,
            shipping_fee: self.shipping_fee,
            total_amount: self.total_amount,
            payment_id: self.payment_id,
            payer_id: self.payer_id,
            order_date: self.order_date,
            order_update_date: self.order_update_date,
        })
    }
}

/// A product row locked for the duration of a checkout transaction.
#[derive(sqlx::FromRow)]
struct LockedProduct {
    title: String,
    image: Option<String>,
    total_stock: i32,
}

/// Lock the given products `FOR UPDATE` in ascending id order and verify
/// every requested quantity fits the available stock.
async fn lock_and_check_stock(
    conn: &mut PgConnection,
    quantities: &BTreeMap<i32, i32>,
) -> Result<BTreeMap<i32, LockedProduct>, StoreError> {
    let mut locked = BTreeMap::new();

    for (&product_id, &requested) in quantities {
        let product = sqlx::query_as::<_, LockedProduct>(
            r"
            SELECT title, image, total_stock
            FROM shop.products
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(StoreError::from_db)?
        .ok_or(StoreError::ProductNotFound(ProductId::new(product_id)))?;

        if requested > product.total_stock {
            return Err(StoreError::InsufficientStock {
                product_id: ProductId::new(product_id),
                title: product.title,
                available: product.total_stock,
                requested,
            });
        }

        locked.insert(product_id, product);
    }

    Ok(locked)
}

/// Decrement stock for every locked product. The `total_stock >= $n` guard
/// backs up the row lock taken by [`lock_and_check_stock`].
async fn decrement_stock(
    conn: &mut PgConnection,
    quantities: &BTreeMap<i32, i32>,
    locked: &BTreeMap<i32, LockedProduct>,
) -> Result<(), StoreError> {
    for (&product_id, &quantity) in quantities {
        let result = sqlx::query(
            r"
            UPDATE shop.products
            SET total_stock = total_stock - $1
            WHERE id = $2 AND total_stock >= $1
            ",
        )
        .bind(quantity)
        .bind(product_id)
        .execute(&mut *conn)
        .await
        .map_err(StoreError::from_db)?;

        if result.rows_affected() == 0 {
            let (title, available) = locked
                .get(&product_id)
                .map_or_else(|| (String::new(), 0), |p| (p.title.clone(), p.total_stock));
            return Err(StoreError::InsufficientStock {
                product_id: ProductId::new(product_id),
                title,
                available,
                requested: quantity,
            });
        }
    }

    Ok(())
}

/// Delete the cart; cart items go with it via `ON DELETE CASCADE`.
async fn delete_cart(conn: &mut PgConnection, cart_id: CartId) -> Result<u64, StoreError> {
    let result = sqlx::query("DELETE FROM shop.carts WHERE id = $1")
        .bind(cart_id)
        .execute(conn)
        .await
        .map_err(StoreError::from_db)?;
    Ok(result.rows_affected())
}

fn aggregate_quantities(items: &[OrderItem]) -> BTreeMap<i32, i32> {
    let mut quantities: BTreeMap<i32, i32> = BTreeMap::new();
    for item in items {
        *quantities.entry(item.product_id.as_i32()).or_insert(0) += item.quantity;
    }
    quantities
}

async fn commit(tx: Transaction<'_, Postgres>) -> Result<(), StoreError> {
    tx.commit().await.map_err(StoreError::from_db)
}

#[async_trait]
impl CheckoutStore for PgStore {
    async fn place_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool().begin().await.map_err(StoreError::from_db)?;

        let cart: Option<(CartId,)> = sqlx::query_as("SELECT id FROM shop.carts WHERE id = $1")
            .bind(order.cart_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(StoreError::from_db)?;
        if cart.is_none() {
            return Err(StoreError::CartNotFound);
        }

        // Duplicate lines for one product are checked and decremented as a
        // single combined quantity.
        let mut quantities: BTreeMap<i32, i32> = BTreeMap::new();
        for line in &order.lines {
            *quantities.entry(line.product_id.as_i32()).or_insert(0) += line.quantity;
        }

        let locked = lock_and_check_stock(&mut tx, &quantities).await?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in order.lines {
            let product = locked
                .get(&line.product_id.as_i32())
                .ok_or(StoreError::ProductNotFound(line.product_id))?;
            let item = line
                .into_item(product.title.clone(), product.image.clone())
                .ok_or_else(|| StoreError::Conflict("order line total overflowed".to_owned()))?;
            items.push(item);
        }

        let starts_confirmed = order.order_status == OrderStatus::Confirmed;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO shop.orders
                (user_id, cart_id, items, address_info,
                 order_status, payment_method, payment_status,
                 subtotal, shipping_fee, total_amount)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id)
        .bind(order.cart_id)
        .bind(Json(&items))
        .bind(Json(&order.address_info))
        .bind(order.order_status.to_string())
        .bind(order.payment_method.to_string())
        .bind(order.payment_status.to_string())
        .bind(order.subtotal)
        .bind(order.shipping_fee)
        .bind(order.total_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_db)?;

        if starts_confirmed {
            decrement_stock(&mut tx, &quantities, &locked).await?;
            delete_cart(&mut tx, row.cart_id).await?;
        }

        let placed = row.into_order()?;
        commit(tx).await?;
        Ok(placed)
    }

    async fn capture_payment(
        &self,
        order_id: OrderId,
        capture: PaymentCapture,
    ) -> Result<Order, StoreError> {
        let mut tx = self.pool().begin().await.map_err(StoreError::from_db)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(StoreError::from_db)?
        .ok_or(StoreError::OrderNotFound(order_id))?;

        let order = row.into_order()?;

        // Idempotent: a second capture of a settled order changes nothing.
        if order.payment_status == PaymentStatus::Paid
            || order.order_status == OrderStatus::Confirmed
        {
            return Ok(order);
        }

        let quantities = aggregate_quantities(&order.items);
        let locked = lock_and_check_stock(&mut tx, &quantities).await?;
        decrement_stock(&mut tx, &quantities, &locked).await?;

        // The cart may already be gone (a later checkout consumed it);
        // capture tolerates that.
        delete_cart(&mut tx, order.cart_id).await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            UPDATE shop.orders
            SET order_status = $1, payment_status = $2,
                payment_id = $3, payer_id = $4,
                order_update_date = NOW()
            WHERE id = $5
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(OrderStatus::Confirmed.to_string())
        .bind(PaymentStatus::Paid.to_string())
        .bind(&capture.payment_id)
        .bind(&capture.payer_id)
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_db)?;

        let captured = row.into_order()?;
        commit(tx).await?;
        Ok(captured)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM shop.orders WHERE user_id = $1 ORDER BY order_date DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }
}
