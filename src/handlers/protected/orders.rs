// handlers/protected/orders.rs - /api/orders (customer's own orders)

use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{JsonBody, Page, Paginated, PathParam, QueryParams};
use crate::database::models::OrderDetail;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::logistics::{tracking_for, Tracking};
use crate::services::order_service::{CheckoutInput, OrderFilter, OrderService};
use crate::state::AppState;
use crate::types::OrderStatus;

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<OrderStatus>,
}

fn service(state: &AppState) -> OrderService {
    OrderService::new(state.pool().clone(), state.mailer.clone())
}

/// POST /api/orders - Check out the cart
pub async fn post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(payload): JsonBody<CheckoutInput>,
) -> ApiResult<OrderDetail> {
    let order = service(&state).checkout(auth.user_id, payload).await?;
    Ok(ApiResponse::created(order))
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<OrderListQuery>,
) -> ApiResult<Paginated<OrderDetail>> {
    let filter = OrderFilter {
        customer_id: Some(auth.user_id),
        status: query.status,
        ..Default::default()
    };
    let orders = service(&state)
        .list(&filter, Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(orders))
}

/// GET /api/orders/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<OrderDetail> {
    let order = service(&state).customer_detail(auth.user_id, id).await?;
    Ok(ApiResponse::success(order))
}

/// POST /api/orders/:id/cancel - Only while pending; restocks the items
pub async fn cancel_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<OrderDetail> {
    let order = service(&state).cancel(auth.user_id, id).await?;
    Ok(ApiResponse::success(order))
}

/// GET /api/orders/:id/tracking
pub async fn tracking_get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Tracking> {
    let detail = service(&state).customer_detail(auth.user_id, id).await?;
    Ok(ApiResponse::success(tracking_for(&detail.order)))
}
