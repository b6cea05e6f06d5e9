pub mod config;
pub mod error;
pub mod forest;
pub mod handlers;
pub mod msg;
pub mod router;
pub mod snapshot;
mod sort;
pub mod types;

pub use {error::Error, forest::Forest};

pub const SERVER_NAME:    &str = env!("CARGO_PKG_NAME");
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
