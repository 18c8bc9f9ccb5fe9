// handlers/elevated/users.rs - /api/admin/users

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::api::{JsonBody, Page, Paginated, PathParam, QueryParams};
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::admin_service::{AdminService, Removal, UserFilter, UserUpdate};
use crate::state::AppState;
use crate::types::Role;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

impl UserListQuery {
    pub fn filter(&self) -> UserFilter {
        UserFilter {
            role: self.role,
            is_active: self.is_active,
            search: self.search.clone(),
        }
    }
}

/// GET /api/admin/users
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<UserListQuery>,
) -> ApiResult<Paginated<User>> {
    let users = AdminService::new(state.pool().clone())
        .list_users(&query.filter(), Page::resolve(query.page, query.limit))
        .await?;
    Ok(ApiResponse::success(users))
}

/// GET /api/admin/users/:id
pub async fn get(State(state): State<AppState>, PathParam(id): PathParam<Uuid>) -> ApiResult<User> {
    let user = AdminService::new(state.pool().clone()).get_user(id).await?;
    Ok(ApiResponse::success(user))
}

/// PATCH /api/admin/users/:id - Activate, deactivate or change role
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<UserUpdate>,
) -> ApiResult<User> {
    let user = AdminService::new(state.pool().clone())
        .update_user(auth.user_id, id, payload)
        .await?;
    Ok(ApiResponse::success(user))
}

/// DELETE /api/admin/users/:id - Users with orders or products are deactivated instead
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(id): PathParam<Uuid>,
) -> ApiResult<Value> {
    let removal = AdminService::new(state.pool().clone())
        .delete_user(auth.user_id, id)
        .await?;
    let message = match removal {
        Removal::Deleted => "User deleted",
        Removal::Deactivated => "User has order or product history and was deactivated",
    };
    Ok(ApiResponse::message(message))
}
