//! Catalog handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use clementine_core::ProductId;

use super::{ApiResponse, ok};
use crate::db::products::{ProductFilter, ProductRepository, ProductSort};
use crate::error::{ApiError, Result};
use crate::models::Product;
use crate::state::AppState;

/// Catalog listing query parameters.
///
/// `category` and `brand` accept comma-separated lists; unknown `sortBy`
/// values fall back to the default sort.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub sort_by: Option<String>,
}

fn split_csv(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// `GET /api/products` - filtered, sorted catalog listing.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let filter = ProductFilter {
        categories: split_csv(query.category.as_deref()),
        brands: split_csv(query.brand.as_deref()),
        sort_by: ProductSort::parse(query.sort_by.as_deref().unwrap_or_default()),
    };

    let products = ProductRepository::new(state.pool()).list(&filter).await?;
    Ok(ok(products))
}

/// `GET /api/products/{id}` - product detail.
pub async fn detail(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("product {product_id}")))?;
    Ok(ok(product))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_splitting_trims_and_drops_empties() {
        assert_eq!(split_csv(Some("shoes, bags ,,")), vec!["shoes", "bags"]);
        assert!(split_csv(None).is_empty());
        assert!(split_csv(Some("")).is_empty());
    }
}
