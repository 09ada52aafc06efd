//! Shared application state.

use std::sync::Arc;

use vendorya_db::Database;

/// Handed to every handler through axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    pub db: Database,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn shared(db: Database) -> SharedState {
        Arc::new(AppState { db })
    }
}
