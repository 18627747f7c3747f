//! API module for Armada Timer
//!
//! REST endpoints and router assembly.

pub mod history;
pub mod stations;

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::services::station_registry::StationRegistry;
use crate::websocket;

pub use history::create_history_routes;
pub use stations::{create_station_routes, StationView};

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: StationRegistry,
    /// File name offered for the CSV download
    pub export_filename: Arc<str>,
}

impl AppState {
    pub fn new(registry: StationRegistry, export_filename: impl Into<Arc<str>>) -> Self {
        Self {
            registry,
            export_filename: export_filename.into(),
        }
    }
}

/// Build the full application router without middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/stations", create_station_routes())
        .nest("/api/history", create_history_routes())
        .route("/ws", get(websocket::events_handler))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
