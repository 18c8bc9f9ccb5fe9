// handlers/elevated/feedback.rs - /api/admin/feedback

use axum::extract::{Extension, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{JsonBody, Page, Paginated, PathParam, QueryParams};
use crate::database::models::Feedback;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::feedback_service::{FeedbackService, FeedbackUpdate};
use crate::state::AppState;
use crate::types::FeedbackStatus;

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<FeedbackStatus>,
}

fn service(state: &AppState) -> FeedbackService {
    FeedbackService::new(state.pool().clone(), state.mailer.clone())
}

/// GET /api/admin/feedback
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<FeedbackQuery>,
) -> ApiResult<Paginated<Feedback>> {
    let feedback = service(&state)
        .list(query.status, Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(feedback))
}

/// GET /api/admin/feedback/:id
pub async fn get(State(state): State<AppState>, PathParam(id): PathParam<Uuid>) -> ApiResult<Feedback> {
    let feedback = service(&state).get(id).await?;
    Ok(ApiResponse::success(feedback))
}

/// PATCH /api/admin/feedback/:id - Move status forward and/or respond (emails the author)
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<FeedbackUpdate>,
) -> ApiResult<Feedback> {
    let feedback = service(&state).update(auth.user_id, id, payload).await?;
    Ok(ApiResponse::success(feedback))
}
