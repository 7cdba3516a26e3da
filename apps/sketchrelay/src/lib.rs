#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod entities;
pub mod error;
pub mod errors;
pub mod infra;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod utils;

// Re-exports for public API
pub use error::AppError;
pub use errors::domain::DomainError;
pub use infra::db::connect;
pub use store::{GameStore, SeaStore};

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    sketchrelay_test_support::logging::init();
}
