// handlers/seller/mod.rs - Seller handlers (/api/seller/*)
//
// Middleware: jwt_auth_middleware → validate_user_middleware →
// require_seller_middleware. Every query is scoped to the caller's own
// products and order items.

pub mod analytics;
pub mod orders;
pub mod products;
pub mod profile;
