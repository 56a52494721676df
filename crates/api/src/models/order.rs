//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clementine_core::{CartId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, Price, ProductId, UserId};

/// A placed order.
///
/// `items` and `address_info` are snapshots frozen at checkout time. Editing
/// a product's price or the user's address book afterwards does not change
/// an existing order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub cart_id: CartId,
    pub items: Vec<OrderItem>,
    pub address_info: AddressSnapshot,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total_amount: Price,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<String>,
    pub order_date: DateTime<Utc>,
    pub order_update_date: DateTime<Utc>,
}

/// A frozen order line item.
///
/// Stored verbatim as JSONB; the camelCase field names are both the wire
/// and the storage representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub image: Option<String>,
    pub price: Price,
    pub quantity: i32,
    pub total_price: Price,
}

/// A frozen shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSnapshot {
    pub address: String,
    pub city: String,
    pub pincode: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A validated order ready to be persisted atomically.
///
/// Produced by the checkout service after request validation and totals
/// computation; consumed by a [`crate::services::checkout::CheckoutStore`].
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub cart_id: CartId,
    /// Requested lines: product, submitted unit price, quantity.
    pub lines: Vec<OrderLine>,
    pub address_info: AddressSnapshot,
    pub order_status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total_amount: Price,
}

/// One requested line of a new order.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub price: Price,
    pub quantity: i32,
}

impl OrderLine {
    /// Build the frozen snapshot for this line from the authoritative
    /// product title and image read inside the checkout transaction.
    #[must_use]
    pub fn into_item(self, title: String, image: Option<String>) -> Option<OrderItem> {
        let total_price = self.price.checked_mul_quantity(self.quantity)?;
        Some(OrderItem {
            product_id: self.product_id,
            title,
            image,
            price: self.price,
            quantity: self.quantity,
            total_price,
        })
    }
}

/// Payment identifiers confirmed by the gateway, consumed by capture.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCapture {
    pub payment_id: String,
    pub payer_id: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn order_item_snapshot_totals() {
        let line = OrderLine {
            product_id: ProductId::new(1),
            price: "10".parse().unwrap(),
            quantity: 2,
        };
        let item = line.into_item("Widget".to_owned(), None).unwrap();
        assert_eq!(item.total_price, Price::from(20));
        assert_eq!(item.title, "Widget");
    }

    #[test]
    fn order_item_serde_uses_camel_case() {
        let item = OrderItem {
            product_id: ProductId::new(3),
            title: "Widget".to_owned(),
            image: None,
            price: "9.99".parse().unwrap(),
            quantity: 1,
            total_price: "9.99".parse().unwrap(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["productId"], 3);
        assert_eq!(value["totalPrice"], "9.99");
        let back: OrderItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn address_snapshot_round_trip_without_notes() {
        let snapshot = AddressSnapshot {
            address: "12 Mango Lane".to_owned(),
            city: "Karachi".to_owned(),
            pincode: "74200".to_owned(),
            phone: "03001234567".to_owned(),
            notes: None,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("notes"));
        let back: AddressSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
