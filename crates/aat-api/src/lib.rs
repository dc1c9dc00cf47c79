//! aat-api - Remote store endpoint for AAT booking sync
//!
//! Serves the shared cloud document under `/api/sync`: read, write-merge and
//! delete over a single key in the configured document store.

pub mod config;
pub mod error;
pub mod routes;

pub use config::AppConfig;
pub use routes::{app_router, AppState};
