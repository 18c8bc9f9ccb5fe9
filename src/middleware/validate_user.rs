use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::database::is_connection_error;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::Role;

/// Fallback accounts have no database row to check, so they are only ever
/// trusted as customers whatever the token claims.
fn fallback_identity(auth_user: AuthUser) -> AuthUser {
    if auth_user.role != Role::Customer {
        tracing::warn!(
            "Fallback token for {} claims role {}, treating as customer",
            auth_user.user_id,
            auth_user.role
        );
    }
    AuthUser {
        role: Role::Customer,
        ..auth_user
    }
}

/// Confirms the token's user still exists and is active.
///
/// The role is reloaded from the database so promotions and demotions take
/// effect without waiting for the access token to expire. Fallback tokens
/// skip the lookup and are limited to the customer role.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    if auth_user.fallback {
        request.extensions_mut().insert(fallback_identity(auth_user));
        return Ok(next.run(request).await);
    }

    let row: Option<(bool, String)> = sqlx::query_as("SELECT is_active, role FROM users WHERE id = $1")
        .bind(auth_user.user_id)
        .fetch_optional(state.pool())
        .await
        .map_err(|e| {
            if is_connection_error(&e) {
                tracing::error!("Database unreachable while validating user {}: {}", auth_user.user_id, e);
                ApiError::service_unavailable("Database temporarily unavailable")
            } else {
                tracing::error!("Database error validating user {}: {}", auth_user.user_id, e);
                ApiError::internal_server_error("Failed to validate user")
            }
        })?;

    let (is_active, role) = row.ok_or_else(|| {
        tracing::warn!("User validation failed: user {} no longer exists", auth_user.user_id);
        ApiError::forbidden("Account no longer exists")
    })?;

    if !is_active {
        tracing::warn!("User validation failed: user {} is deactivated", auth_user.user_id);
        return Err(ApiError::forbidden("Account is deactivated"));
    }

    let role: Role = role.parse().map_err(|e| {
        tracing::error!("User {} has an unreadable role: {}", auth_user.user_id, e);
        ApiError::internal_server_error("Failed to validate user")
    })?;

    if role != auth_user.role {
        tracing::debug!("User {} role changed from {} to {}", auth_user.user_id, auth_user.role, role);
        request.extensions_mut().insert(AuthUser { role, ..auth_user });
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn fallback_user(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "offline@example.com".to_string(),
            role,
            fallback: true,
        }
    }

    #[test]
    fn fallback_tokens_never_keep_elevated_roles() {
        for role in [Role::Admin, Role::Seller, Role::Customer] {
            let user = fallback_user(role);
            let id = user.user_id;
            let trusted = fallback_identity(user);
            assert_eq!(trusted.role, Role::Customer);
            assert_eq!(trusted.user_id, id);
            assert!(trusted.fallback);
        }
    }
}
