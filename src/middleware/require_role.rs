use axum::{extract::Request, middleware::Next, response::Response};

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::types::Role;

fn require(request: &Request, role: Role) -> Result<(), ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if user.role != role {
        tracing::warn!("User {} ({}) denied access to {} route {}", user.user_id, user.role, role, request.uri().path());
        return Err(ApiError::forbidden(format!("{} access required", role)));
    }
    Ok(())
}

pub async fn require_admin_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    require(&request, Role::Admin)?;
    Ok(next.run(request).await)
}

pub async fn require_seller_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    require(&request, Role::Seller)?;
    Ok(next.run(request).await)
}

/// Cart and checkout are for shoppers only
pub async fn require_customer_middleware(request: Request, next: Next) -> Result<Response, ApiError> {
    require(&request, Role::Customer)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware::from_fn, routing::get, Router};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn app() -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(from_fn(require_admin_middleware))
    }

    fn request(role: Option<Role>) -> Request {
        let mut request = Request::builder().uri("/admin").body(Body::empty()).unwrap();
        if let Some(role) = role {
            request.extensions_mut().insert(AuthUser {
                user_id: Uuid::new_v4(),
                email: "someone@example.com".to_string(),
                role,
                fallback: false,
            });
        }
        request
    }

    #[tokio::test]
    async fn wrong_role_is_forbidden() {
        let response = app().oneshot(request(Some(Role::Seller))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        let response = app().oneshot(request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn sellers_do_not_shop() {
        let cart = Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(from_fn(require_customer_middleware));
        let response = cart.clone().oneshot(request(Some(Role::Seller))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = cart.oneshot(request(Some(Role::Customer))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn matching_role_passes() {
        let response = app().oneshot(request(Some(Role::Admin))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
