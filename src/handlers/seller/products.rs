// handlers/seller/products.rs - /api/seller/products

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::{JsonBody, Page, Paginated, PathParam, QueryParams};
use crate::database::models::Product;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::product_service::{ProductFilter, ProductInput, ProductService, ProductUpdate};
use crate::state::AppState;
use crate::types::{ApprovalStatus, ProductStatus};

#[derive(Debug, Default, Deserialize)]
pub struct SellerProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ProductStatus>,
    pub approval_status: Option<ApprovalStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: ProductStatus,
}

/// GET /api/seller/products
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<SellerProductQuery>,
) -> ApiResult<Paginated<Product>> {
    let filter = ProductFilter {
        seller_id: Some(auth.user_id),
        status: query.status,
        approval_status: query.approval_status,
        search: query.search,
        ..Default::default()
    };
    let products = ProductService::new(state.pool().clone())
        .list(&filter, Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(products))
}

/// POST /api/seller/products - New listings start pending review
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ProductInput>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool().clone())
        .create(auth.user_id, payload)
        .await?;
    Ok(ApiResponse::created(product))
}

/// GET /api/seller/products/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool().clone())
        .seller_get(auth.user_id, id)
        .await?;
    Ok(ApiResponse::success(product))
}

/// PUT /api/seller/products/:id - Content edits send the listing back for review
pub async fn put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<ProductUpdate>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool().clone())
        .update(auth.user_id, id, payload)
        .await?;
    Ok(ApiResponse::success(product))
}

/// PATCH /api/seller/products/:id/status
pub async fn status_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<StatusChange>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool().clone())
        .set_status(auth.user_id, id, payload.status)
        .await?;
    Ok(ApiResponse::success(product))
}

/// DELETE /api/seller/products/:id - Products with order history are deactivated instead
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Value> {
    let deleted = ProductService::new(state.pool().clone())
        .delete(auth.user_id, id)
        .await?;
    let message = if deleted {
        "Product deleted"
    } else {
        "Product has order history and was deactivated"
    };
    Ok(ApiResponse::message(message))
}
