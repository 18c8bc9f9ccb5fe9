pub mod manager;
pub mod models;

pub use manager::{is_connection_error, is_unique_violation, DatabaseError, DatabaseManager};
