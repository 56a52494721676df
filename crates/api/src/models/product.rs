//! Product catalog domain types.

use rust_decimal::Decimal;
use serde::Serialize;

use clementine_core::{Price, ProductId};

/// A catalog product.
///
/// `total_stock` is the only field mutated by the checkout workflow and is
/// guarded by a `CHECK (total_stock >= 0)` constraint in the database.
/// `average_review` caches the mean review value, rounded to 2 decimals.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub category: String,
    pub brand: String,
    pub image: Option<String>,
    pub price: Price,
    pub sale_price: Option<Price>,
    pub total_stock: i32,
    pub average_review: Option<Decimal>,
}

impl Product {
    /// The price a buyer actually pays: the sale price when one is set,
    /// otherwise the list price.
    #[must_use]
    pub fn effective_price(&self) -> Price {
        self.sale_price.unwrap_or(self.price)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(price: &str, sale_price: Option<&str>) -> Product {
        Product {
            id: ProductId::new(1),
            title: "Test".to_owned(),
            description: String::new(),
            category: String::new(),
            brand: String::new(),
            image: None,
            price: price.parse().unwrap(),
            sale_price: sale_price.map(|p| p.parse().unwrap()),
            total_stock: 10,
            average_review: None,
        }
    }

    #[test]
    fn effective_price_prefers_sale_price() {
        assert_eq!(
            product("20", Some("15")).effective_price(),
            Price::from(15)
        );
        assert_eq!(product("20", None).effective_price(), Price::from(20));
    }
}
