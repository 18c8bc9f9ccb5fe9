// handlers/seller/analytics.rs - /api/seller/analytics

use axum::extract::{Extension, State};
use serde::Deserialize;

use crate::api::QueryParams;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::analytics_service::{AnalyticsService, SellerAnalytics};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
}

/// GET /api/seller/analytics?days=30
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    QueryParams(query): QueryParams<WindowQuery>,
) -> ApiResult<SellerAnalytics> {
    let analytics = AnalyticsService::new(state.pool().clone())
        .seller(auth.user_id, query.days)
        .await?;
    Ok(ApiResponse::success(analytics))
}
