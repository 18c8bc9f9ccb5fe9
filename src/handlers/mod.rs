// handlers/mod.rs - Tiered handler architecture
//
// Public (no auth) → Protected (JWT, /api/*) → Seller (JWT + seller role,
// /api/seller/*) → Elevated (JWT + admin role, /api/admin/*)
//
// Tier membership is enforced by the router's middleware layers, not by
// the handlers themselves.
pub mod elevated;
pub mod protected;
pub mod public;
pub mod seller;

mod download;
