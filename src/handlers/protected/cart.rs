// handlers/protected/cart.rs - /api/cart

use axum::extract::{Extension, State};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{JsonBody, PathParam};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::cart_service::{Cart, CartService};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItem {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i32,
}

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct SetQuantity {
    pub quantity: i32,
}

/// GET /api/cart
pub async fn get(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Cart> {
    let cart = CartService::new(state.pool().clone()).get(auth.user_id).await?;
    Ok(ApiResponse::success(cart))
}

/// POST /api/cart - Add to the cart; quantities accumulate
pub async fn post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    JsonBody(payload): JsonBody<AddItem>,
) -> ApiResult<Cart> {
    let cart = CartService::new(state.pool().clone())
        .add(auth.user_id, payload.product_id, payload.quantity)
        .await?;
    Ok(ApiResponse::success(cart))
}

/// DELETE /api/cart - Empty the cart
pub async fn delete(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<Value> {
    let removed = CartService::new(state.pool().clone()).clear(auth.user_id).await?;
    Ok(ApiResponse::success(json!({ "removed": removed })))
}

/// PUT /api/cart/:product_id - Set a line's quantity (0 removes it)
pub async fn item_put(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(product_id): PathParam<Uuid>,
    JsonBody(payload): JsonBody<SetQuantity>,
) -> ApiResult<Cart> {
    let cart = CartService::new(state.pool().clone())
        .set_quantity(auth.user_id, product_id, payload.quantity)
        .await?;
    Ok(ApiResponse::success(cart))
}

/// DELETE /api/cart/:product_id
pub async fn item_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    PathParam(product_id): PathParam<Uuid>,
) -> ApiResult<Cart> {
    let cart = CartService::new(state.pool().clone())
        .remove(auth.user_id, product_id)
        .await?;
    Ok(ApiResponse::success(cart))
}
