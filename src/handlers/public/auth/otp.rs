// handlers/public/auth/otp.rs - One-time code flows
//
// Issue endpoints always answer 200 so they cannot be used to probe which
// emails are registered.

use axum::extract::State;
use serde::Deserialize;
use serde_json::Value;

use crate::api::JsonBody;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::AuthService;
use crate::state::AppState;
use crate::types::OtpPurpose;

const CODE_SENT: &str = "If the account exists, a code has been sent";

#[derive(Debug, Deserialize)]
pub struct OtpSendRequest {
    pub email: String,
    pub purpose: OtpPurpose,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// POST /auth/otp/send
pub async fn otp_send_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<OtpSendRequest>,
) -> ApiResult<Value> {
    send_code(&state, &payload.email, payload.purpose).await?;
    Ok(ApiResponse::message(CODE_SENT))
}

/// POST /auth/verify-email
pub async fn verify_email_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<VerifyEmailRequest>,
) -> ApiResult<Value> {
    AuthService::from_state(&state)
        .verify_email(&payload.email, &payload.code)
        .await?;
    Ok(ApiResponse::message("Email verified"))
}

/// POST /auth/forgot-password
pub async fn forgot_password_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ForgotPasswordRequest>,
) -> ApiResult<Value> {
    send_code(&state, &payload.email, OtpPurpose::ResetPassword).await?;
    Ok(ApiResponse::message(CODE_SENT))
}

/// POST /auth/reset-password
pub async fn reset_password_post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ResetPasswordRequest>,
) -> ApiResult<Value> {
    AuthService::from_state(&state)
        .reset_password(&payload.email, &payload.code, &payload.new_password)
        .await?;
    Ok(ApiResponse::message("Password updated, please sign in again"))
}

async fn send_code(state: &AppState, email: &str, purpose: OtpPurpose) -> Result<(), ApiError> {
    match AuthService::from_state(state).request_code(email, purpose).await {
        Ok(()) => Ok(()),
        // Only an outage is worth surfacing; everything else stays silent
        Err(e) => {
            let api: ApiError = e.into();
            if api.status_code().is_server_error() {
                Err(api)
            } else {
                Ok(())
            }
        }
    }
}
