// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Route Prefix: none (e.g. /auth/*, /products, /feedback)
// Middleware: none. Feedback optionally reads a bearer token to attach the
// author's user id.

pub mod auth;
pub mod catalog;
pub mod chatbot;
pub mod feedback;
pub mod seller_applications;
pub mod system;
