// handlers/public/system.rs - GET / and GET /health

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service name, version and endpoint map
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Marketplace API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "public": {
                    "auth": "/auth/{register,login,refresh,logout,otp/send,verify-email,forgot-password,reset-password}",
                    "products": "/products[/:id]",
                    "categories": "/categories",
                    "seller_applications": "/seller-applications",
                    "feedback": "/feedback",
                    "chatbot": "/chatbot",
                    "health": "/health"
                },
                "protected": {
                    "profile": "/api/me[/password]",
                    "cart": "/api/cart[/:product_id]",
                    "orders": "/api/orders[/:id[/cancel|/tracking]]"
                },
                "seller": "/api/seller/{products,orders,analytics,export/orders,profile}",
                "admin": "/api/admin/{users,products,categories,orders,seller-applications,feedback,analytics,export}"
            }
        }
    }))
}

/// GET /health - Database reachability
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "database": "connected", "version": env!("CARGO_PKG_VERSION") })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "unavailable", "version": env!("CARGO_PKG_VERSION") })),
            )
        }
    }
}
