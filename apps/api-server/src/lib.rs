//! # Vendorya API Server
//!
//! HTTP surface over vendorya-db.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          API Server                                     │
//! │                                                                         │
//! │  Request ──► TraceLayer ──► Router ──► CurrentPrincipal (x-user-id)     │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                         handler (routes/*.rs)                           │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                    db.checkout() / db.shifts() / ...                    │
//! │                                  │                                      │
//! │                                  ▼                                      │
//! │                   Json<T>  or  ApiError { "error": msg }                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `VENDORYA_BIND_ADDR` - listen address (default `0.0.0.0:8080`)
//! - `VENDORYA_DATABASE_PATH` - SQLite file (default `./vendorya.db`)
//! - `VENDORYA_DB_MAX_CONNECTIONS` - pool size (default 5)
//! - `VENDORYA_LOG_LEVEL` - filter when `RUST_LOG` is unset (default `info`)

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::{AppState, SharedState};
