// handlers/public/seller_applications.rs - POST /seller-applications

use axum::extract::State;

use crate::api::JsonBody;
use crate::database::models::SellerApplication;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::seller_application_service::{ApplicationInput, SellerApplicationService};
use crate::state::AppState;

/// POST /seller-applications - Apply to sell; an admin reviews the application
pub async fn post(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ApplicationInput>,
) -> ApiResult<SellerApplication> {
    let application = SellerApplicationService::new(state.pool().clone(), state.mailer.clone())
        .submit(payload)
        .await?;
    Ok(ApiResponse::created(application))
}
