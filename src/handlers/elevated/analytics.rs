// handlers/elevated/analytics.rs - /api/admin/analytics/*

use axum::extract::State;
use serde::Deserialize;

use crate::api::QueryParams;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::analytics_service::{AnalyticsService, CustomerSegmentation, Dashboard};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
}

/// GET /api/admin/analytics/dashboard?days=30
pub async fn dashboard_get(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<WindowQuery>,
) -> ApiResult<Dashboard> {
    let dashboard = AnalyticsService::new(state.pool().clone()).dashboard(query.days).await?;
    Ok(ApiResponse::success(dashboard))
}

/// GET /api/admin/analytics/customers - RFM segmentation
pub async fn customers_get(State(state): State<AppState>) -> ApiResult<CustomerSegmentation> {
    let segments = AnalyticsService::new(state.pool().clone()).customer_segments().await?;
    Ok(ApiResponse::success(segments))
}
