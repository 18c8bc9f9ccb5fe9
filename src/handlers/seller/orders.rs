// handlers/seller/orders.rs - /api/seller/orders, /api/seller/export/orders

use axum::{
    extract::{Extension, State},
    response::Response,
};
use serde::Deserialize;

use crate::api::{Page, Paginated, QueryParams};
use crate::database::models::SellerOrder;
use crate::error::ApiError;
use crate::handlers::download::{attachment, ExportQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::order_service::OrderService;
use crate::state::AppState;
use crate::types::OrderStatus;

#[derive(Debug, Default, Deserialize)]
pub struct SellerOrderQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatus>,
}

/// GET /api/seller/orders - Orders containing the seller's items, reduced to those items
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<SellerOrderQuery>,
) -> ApiResult<Paginated<SellerOrder>> {
    let orders = OrderService::new(state.pool().clone(), state.mailer.clone())
        .seller_list(auth.user_id, query.status, Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(orders))
}

/// GET /api/seller/export/orders?format=csv|xls - One row per sold line item
pub async fn export(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<ExportQuery>,
) -> Result<Response, ApiError> {
    let rows = OrderService::new(state.pool().clone(), state.mailer.clone())
        .seller_sales(auth.user_id)
        .await?;
    attachment(&rows, "orders", query.format.unwrap_or_default())
}
