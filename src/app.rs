// app.rs - Router assembly
//
// Public routes sit at the root. Everything under /api requires a valid
// access token for an active account; /api/seller and /api/admin add a
// role check on top. Role checks use route_layer so unknown paths still
// answer 404 rather than 401/403.

use axum::{
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{elevated, protected, public, seller};
use crate::middleware::{
    jwt_auth_middleware, require_admin_middleware, require_customer_middleware, require_seller_middleware,
    validate_user_middleware,
};
use crate::state::AppState;

/// Build the full application router using the global configuration
pub fn app(state: AppState) -> Router {
    app_with_config(state, crate::config::config())
}

pub fn app_with_config(state: AppState, config: &AppConfig) -> Router {
    let api = Router::new()
        .merge(account_routes())
        .merge(customer_routes())
        .nest("/seller", seller_routes())
        .nest("/admin", admin_routes())
        .route_layer(from_fn_with_state(state.clone(), validate_user_middleware))
        .route_layer(from_fn(jwt_auth_middleware));

    let mut router = Router::new()
        .merge(public_routes())
        .nest("/api", api)
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes));

    if let Some(cors) = cors_layer(config) {
        router = router.layer(cors);
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        // Session management
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/refresh", post(auth::refresh_post))
        .route("/auth/logout", post(auth::logout_post))
        // One-time codes
        .route("/auth/otp/send", post(auth::otp_send_post))
        .route("/auth/verify-email", post(auth::verify_email_post))
        .route("/auth/forgot-password", post(auth::forgot_password_post))
        .route("/auth/reset-password", post(auth::reset_password_post))
        // Catalogue
        .route("/products", get(public::catalog::products_get))
        .route("/products/:id", get(public::catalog::product_get))
        .route("/categories", get(public::catalog::categories_get))
        // Inbound forms
        .route("/seller-applications", post(public::seller_applications::post))
        .route("/feedback", post(public::feedback::post))
        .route("/chatbot", post(public::chatbot::post))
}

fn account_routes() -> Router<AppState> {
    use protected::me;

    Router::new()
        .route("/me", get(me::get).put(me::put))
        .route("/me/password", put(me::password_put))
}

fn customer_routes() -> Router<AppState> {
    use protected::{cart, orders};

    Router::new()
        .route("/cart", get(cart::get).post(cart::post).delete(cart::delete))
        .route("/cart/:product_id", put(cart::item_put).delete(cart::item_delete))
        .route("/orders", get(orders::list).post(orders::post))
        .route("/orders/:id", get(orders::get))
        .route("/orders/:id/cancel", post(orders::cancel_post))
        .route("/orders/:id/tracking", get(orders::tracking_get))
        .route_layer(from_fn(require_customer_middleware))
}

fn seller_routes() -> Router<AppState> {
    use seller::{analytics, orders, products, profile};

    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/:id",
            get(products::get).put(products::put).delete(products::delete),
        )
        .route("/products/:id/status", patch(products::status_patch))
        .route("/orders", get(orders::list))
        .route("/export/orders", get(orders::export))
        .route("/analytics", get(analytics::get))
        .route("/profile", put(profile::put))
        .route_layer(from_fn(require_seller_middleware))
}

fn admin_routes() -> Router<AppState> {
    use elevated::{analytics, categories, export, feedback, orders, products, seller_applications, users};

    Router::new()
        // Users
        .route("/users", get(users::list))
        .route("/users/:id", get(users::get).patch(users::patch).delete(users::delete))
        // Catalogue moderation
        .route("/products", get(products::list))
        .route("/products/:id/approve", post(products::approve_post))
        .route("/products/:id/reject", post(products::reject_post))
        .route("/categories", post(categories::post))
        .route("/categories/:id", put(categories::put).delete(categories::delete))
        // Orders
        .route("/orders", get(orders::list))
        .route("/orders/:id", get(orders::get))
        .route("/orders/:id/status", patch(orders::status_patch))
        // Seller onboarding
        .route("/seller-applications", get(seller_applications::list))
        .route("/seller-applications/:id", get(seller_applications::get))
        .route("/seller-applications/:id/approve", post(seller_applications::approve_post))
        .route("/seller-applications/:id/reject", post(seller_applications::reject_post))
        // Feedback inbox
        .route("/feedback", get(feedback::list))
        .route("/feedback/:id", get(feedback::get).patch(feedback::patch))
        // Reporting
        .route("/analytics/dashboard", get(analytics::dashboard_get))
        .route("/analytics/customers", get(analytics::customers_get))
        .route("/export/:resource", get(export::get))
        .route_layer(from_fn(require_admin_middleware))
}

/// Permissive when no origins are configured, otherwise an explicit allow-list
fn cors_layer(config: &AppConfig) -> Option<CorsLayer> {
    if !config.security.enable_cors {
        return None;
    }
    if config.security.cors_origins.is_empty() {
        return Some(CorsLayer::permissive());
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_follows_config() {
        let mut config = AppConfig::development();
        config.security.enable_cors = false;
        assert!(cors_layer(&config).is_none());

        config.security.enable_cors = true;
        config.security.cors_origins = vec!["https://shop.example.com".to_string()];
        assert!(cors_layer(&config).is_some());
    }
}
