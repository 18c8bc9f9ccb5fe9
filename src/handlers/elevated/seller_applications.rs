// handlers/elevated/seller_applications.rs - /api/admin/seller-applications

use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{JsonBody, Page, Paginated, PathParam, QueryParams};
use crate::database::models::SellerApplication;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::seller_application_service::SellerApplicationService;
use crate::state::AppState;
use crate::types::ApplicationStatus;

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<ApplicationStatus>,
}

#[derive(Debug, Deserialize)]
pub struct Rejection {
    #[serde(default)]
    pub reason: String,
}

fn service(state: &AppState) -> SellerApplicationService {
    SellerApplicationService::new(state.pool().clone(), state.mailer.clone())
}

/// GET /api/admin/seller-applications
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ApplicationQuery>,
) -> ApiResult<Paginated<SellerApplication>> {
    let applications = service(&state)
        .list(query.status, Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(applications))
}

/// GET /api/admin/seller-applications/:id
pub async fn get(State(state): State<AppState>, PathParam(id): PathParam<Uuid>) -> ApiResult<SellerApplication> {
    let application = service(&state).get(id).await?;
    Ok(ApiResponse::success(application))
}

/// POST /api/admin/seller-applications/:id/approve - Creates the seller account
pub async fn approve_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<SellerApplication> {
    let application = service(&state).approve(auth.user_id, id).await?;
    Ok(ApiResponse::success(application))
}

/// POST /api/admin/seller-applications/:id/reject
pub async fn reject_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<Rejection>,
) -> ApiResult<SellerApplication> {
    let application = service(&state).reject(auth.user_id, id, &payload.reason).await?;
    Ok(ApiResponse::success(application))
}
