// handlers/elevated/orders.rs - /api/admin/orders

use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{JsonBody, Page, Paginated, PathParam, QueryParams};
use crate::database::models::OrderDetail;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::order_service::{OrderFilter, OrderService, StatusUpdate};
use crate::state::AppState;
use crate::types::OrderStatus;

#[derive(Debug, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
}

impl AdminOrderQuery {
    pub fn filter(&self) -> OrderFilter {
        OrderFilter {
            customer_id: self.customer_id,
            seller_id: self.seller_id,
            status: self.status,
        }
    }
}

fn service(state: &AppState) -> OrderService {
    OrderService::new(state.pool().clone(), state.mailer.clone())
}

/// GET /api/admin/orders
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AdminOrderQuery>,
) -> ApiResult<Paginated<OrderDetail>> {
    let orders = service(&state)
        .list(&query.filter(), Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(orders))
}

/// GET /api/admin/orders/:id
pub async fn get(State(state): State<AppState>, PathParam(id): PathParam<Uuid>) -> ApiResult<OrderDetail> {
    let order = service(&state).detail(id).await?;
    Ok(ApiResponse::success(order))
}

/// PATCH /api/admin/orders/:id/status - Advance along pending → processing → shipped → delivered
pub async fn status_patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<StatusUpdate>,
) -> ApiResult<OrderDetail> {
    let order = service(&state).update_status(auth.user_id, id, payload).await?;
    Ok(ApiResponse::success(order))
}
