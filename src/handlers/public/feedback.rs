// handlers/public/feedback.rs - POST /feedback

use axum::{extract::State, http::HeaderMap};

use crate::api::JsonBody;
use crate::database::models::Feedback;
use crate::middleware::{optional_auth_user, ApiResponse, ApiResult};
use crate::services::feedback_service::{FeedbackInput, FeedbackService};
use crate::state::AppState;

/// POST /feedback - Anyone may leave feedback; signed-in authors are linked
pub async fn post(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(payload): JsonBody<FeedbackInput>,
) -> ApiResult<Feedback> {
    let user_id = optional_auth_user(&headers)
        .filter(|user| !user.fallback)
        .map(|user| user.user_id);

    let feedback = FeedbackService::new(state.pool().clone(), state.mailer.clone())
        .submit(user_id, payload)
        .await?;
    Ok(ApiResponse::created(feedback))
}
