// handlers/seller/profile.rs - /api/seller/profile

use axum::extract::{Extension, State};

use crate::api::JsonBody;
use crate::database::models::SellerProfile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::account_service::{AccountService, SellerProfileUpdate};
use crate::state::AppState;

/// PUT /api/seller/profile - Business and payout details
pub async fn put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(payload): JsonBody<SellerProfileUpdate>,
) -> ApiResult<SellerProfile> {
    let profile = AccountService::new(state.pool().clone())
        .update_seller_profile(auth.user_id, payload)
        .await?;
    Ok(ApiResponse::success(profile))
}
