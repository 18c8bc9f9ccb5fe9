// handlers/elevated/mod.rs - Elevated handlers (admin role required)
//
// Route Prefix: /api/admin/*
// Middleware: jwt_auth_middleware → validate_user_middleware →
// require_admin_middleware
//
// The role is re-read from the database on every request, so a demoted
// admin loses access immediately even while holding an unexpired token.

pub mod analytics;
pub mod categories;
pub mod export;
pub mod feedback;
pub mod orders;
pub mod products;
pub mod seller_applications;
pub mod users;

/*
ELEVATED HANDLER ARCHITECTURE:

Router::new()
    .route("/users", get(elevated::users::list))
    .route("/products/:id/approve", post(elevated::products::approve_post))
    ...
    .layer(from_fn(require_admin_middleware))
    .layer(from_fn_with_state(state, validate_user_middleware))
    .layer(from_fn(jwt_auth_middleware))

Audit trail:
- Every state-changing admin operation logs the acting admin's id and the
  target at info level (tracing), from inside the service layer.
- Fallback-store tokens never reach these routes in practice: fallback
  accounts are always customers.
*/
