//! RiskDesk Backend Library
//!
//! Token login, a gated CSV table of broker accounts with one-step backup,
//! and a per-connection random-number WebSocket stream.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod middleware;
pub mod state;
pub mod store;
pub mod stream;

pub use api::build_router;
pub use config::Config;
pub use state::AppState;
