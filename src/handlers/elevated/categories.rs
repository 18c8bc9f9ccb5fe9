// handlers/elevated/categories.rs - /api/admin/categories

use axum::extract::State;
use serde_json::Value;
use uuid::Uuid;

use crate::api::{JsonBody, PathParam};
use crate::database::models::Category;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::category_service::{CategoryInput, CategoryService, CategoryUpdate};
use crate::state::AppState;

/// POST /api/admin/categories
pub async fn post(State(state): State<AppState>, JsonBody(payload): JsonBody<CategoryInput>) -> ApiResult<Category> {
    let category = CategoryService::new(state.pool().clone()).create(payload).await?;
    Ok(ApiResponse::created(category))
}

/// PUT /api/admin/categories/:id
pub async fn put(
    State(state): State<AppState>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<CategoryUpdate>,
) -> ApiResult<Category> {
    let category = CategoryService::new(state.pool().clone()).update(id, payload).await?;
    Ok(ApiResponse::success(category))
}

/// DELETE /api/admin/categories/:id - Refused while any product uses it
pub async fn delete(State(state): State<AppState>, PathParam(id): PathParam<Uuid>) -> ApiResult<Value> {
    CategoryService::new(state.pool().clone()).delete(id).await?;
    Ok(ApiResponse::message("Category deleted"))
}
