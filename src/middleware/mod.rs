pub mod auth;
pub mod require_role;
pub mod response;
pub mod validate_user;

pub use auth::{jwt_auth_middleware, optional_auth_user, AuthUser};
pub use require_role::{require_admin_middleware, require_customer_middleware, require_seller_middleware};
pub use response::{ApiResponse, ApiResult};
pub use validate_user::validate_user_middleware;
