//! Product repository for catalog queries.

use sqlx::PgPool;

use clementine_core::ProductId;

use super::StoreError;
use crate::models::Product;

const PRODUCT_COLUMNS: &str =
    "id, title, description, category, brand, image, price, sale_price, total_stock, average_review";

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    PriceLowToHigh,
    PriceHighToLow,
    TitleAToZ,
    TitleZToA,
}

impl ProductSort {
    /// Parse the query-string form (`price-lowtohigh` etc.); unknown values
    /// fall back to the default ordering.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price-hightolow" => Self::PriceHighToLow,
            "title-atoz" => Self::TitleAToZ,
            "title-ztoa" => Self::TitleZToA,
            _ => Self::PriceLowToHigh,
        }
    }

    /// The effective sale-aware ORDER BY clause.
    const fn order_by(self) -> &'static str {
        match self {
            Self::PriceLowToHigh => "COALESCE(sale_price, price) ASC, id ASC",
            Self::PriceHighToLow => "COALESCE(sale_price, price) DESC, id ASC",
            Self::TitleAToZ => "LOWER(title) ASC, id ASC",
            Self::TitleZToA => "LOWER(title) DESC, id ASC",
        }
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub categories: Vec<String>,
    pub brands: Vec<String>,
    pub sort_by: ProductSort,
}

/// Repository for product catalog operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn list(&self, filter: &ProductFilter) -> Result<Vec<Product>, StoreError> {
        // sort_by only ever expands to one of the fixed clauses above
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS}
             FROM shop.products
             WHERE (cardinality($1::text[]) = 0 OR category = ANY($1))
               AND (cardinality($2::text[]) = 0 OR brand = ANY($2))
             ORDER BY {}",
            filter.sort_by.order_by()
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&filter.categories)
            .bind(&filter.brands)
            .fetch_all(self.pool)
            .await?;

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM shop.products WHERE id = $1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(product)
    }
}
