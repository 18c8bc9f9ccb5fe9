// handlers/public/catalog.rs - Public catalogue: /products, /products/:id, /categories

use axum::extract::State;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{Page, Paginated, PathParam, QueryParams};
use crate::database::models::{Category, Product};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::category_service::CategoryService;
use crate::services::product_service::{CatalogSort, ProductFilter, ProductService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<CatalogSort>,
}

/// GET /products - Approved, active products only
pub async fn products_get(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<CatalogQuery>,
) -> ApiResult<Paginated<Product>> {
    if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
        if min > max {
            return Err(ApiError::invalid_field("min_price", "cannot exceed max_price"));
        }
    }

    let filter = ProductFilter {
        public_only: true,
        category_id: query.category_id,
        search: query.search,
        min_price: query.min_price,
        max_price: query.max_price,
        sort: query.sort.unwrap_or_default(),
        ..Default::default()
    };
    let page = Page::resolve(query.page, query.limit);

    let products = ProductService::new(state.pool().clone()).list(&filter, page).await?;
    Ok(ApiResponse::success(products))
}

/// GET /products/:id
pub async fn product_get(State(state): State<AppState>, PathParam(id): PathParam<Uuid>) -> ApiResult<Product> {
    let product = ProductService::new(state.pool().clone()).public_get(id).await?;
    Ok(ApiResponse::success(product))
}

/// GET /categories
pub async fn categories_get(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = CategoryService::new(state.pool().clone()).list().await?;
    Ok(ApiResponse::success(categories))
}
