// handlers/protected/me.rs - /api/me profile endpoints

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::Value;

use crate::api::JsonBody;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::account_service::{AccountService, Profile, ProfileUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

fn require_database_account(auth: &AuthUser) -> Result<(), ApiError> {
    if auth.fallback {
        return Err(ApiError::service_unavailable(
            "Profile is unavailable while the database is offline",
        ));
    }
    Ok(())
}

/// GET /api/me
pub async fn get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Profile> {
    require_database_account(&auth)?;
    let profile = AccountService::new(state.pool().clone()).profile(auth.user_id).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/me - Update name and phone
pub async fn put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ProfileUpdate>,
) -> ApiResult<Profile> {
    require_database_account(&auth)?;
    let profile = AccountService::new(state.pool().clone())
        .update_profile(auth.user_id, payload)
        .await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/me/password - Change password; signs out other sessions
pub async fn password_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(payload): JsonBody<PasswordChange>,
) -> ApiResult<Value> {
    require_database_account(&auth)?;
    AccountService::new(state.pool().clone())
        .change_password(auth.user_id, &payload.current_password, &payload.new_password)
        .await?;
    Ok(ApiResponse::message("Password changed"))
}
