// handlers/elevated/products.rs - /api/admin/products review queue

use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{JsonBody, Page, Paginated, PathParam, QueryParams};
use crate::database::models::Product;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::product_service::{ProductFilter, ProductService};
use crate::state::AppState;
use crate::types::{ApprovalStatus, ProductStatus};

#[derive(Debug, Default, Deserialize)]
pub struct AdminProductQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub approval_status: Option<ApprovalStatus>,
    pub status: Option<ProductStatus>,
    pub seller_id: Option<Uuid>,
    pub search: Option<String>,
}

impl AdminProductQuery {
    pub fn filter(&self) -> ProductFilter {
        ProductFilter {
            seller_id: self.seller_id,
            status: self.status,
            approval_status: self.approval_status,
            search: self.search.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Rejection {
    pub reason: Option<String>,
}

/// GET /api/admin/products
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AdminProductQuery>,
) -> ApiResult<Paginated<Product>> {
    let products = ProductService::new(state.pool().clone())
        .list(&query.filter(), Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(products))
}

/// POST /api/admin/products/:id/approve
pub async fn approve_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool().clone())
        .review(auth.user_id, id, ApprovalStatus::Approved, None)
        .await?;
    Ok(ApiResponse::success(product))
}

/// POST /api/admin/products/:id/reject - Requires a reason
pub async fn reject_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<Rejection>,
) -> ApiResult<Product> {
    let product = ProductService::new(state.pool().clone())
        .review(auth.user_id, id, ApprovalStatus::Rejected, payload.reason)
        .await?;
    Ok(ApiResponse::success(product))
}
