pub mod admin;
pub mod export;
pub mod migrate;
pub mod server;
