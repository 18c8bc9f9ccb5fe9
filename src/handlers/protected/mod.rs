// handlers/protected/mod.rs - Authenticated handlers (/api/*)
//
// Middleware: jwt_auth_middleware → validate_user_middleware. Cart and
// order routes additionally require the customer role.

pub mod cart;
pub mod me;
pub mod orders;
