// handlers/public/auth/session.rs - /auth/register, /auth/login, /auth/refresh, /auth/logout

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use crate::api::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{AuthService, AuthSession, RegisterInput};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/register - Create a customer account and sign it in
pub async fn register_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterInput>,
) -> ApiResult<AuthSession> {
    let session = AuthService::from_state(&state).register(payload).await?;
    Ok(ApiResponse::created(session))
}

/// POST /auth/login - Exchange credentials for an access and refresh token
pub async fn login_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> ApiResult<AuthSession> {
    let session = AuthService::from_state(&state)
        .login(&payload.email, &payload.password)
        .await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/refresh - Rotate a refresh token
pub async fn refresh_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> ApiResult<AuthSession> {
    let session = AuthService::from_state(&state).refresh(&payload.refresh_token).await?;
    Ok(ApiResponse::success(session))
}

/// POST /auth/logout - Revoke a refresh token (idempotent)
pub async fn logout_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> ApiResult<Value> {
    AuthService::from_state(&state).logout(&payload.refresh_token).await?;
    Ok(ApiResponse::message("Logged out"))
}
