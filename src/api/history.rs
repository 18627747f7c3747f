//! History API Endpoints
//!
//! Session history listing, CSV download and reset.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};

use super::AppState;
use crate::models::session_record::SessionRecord;

/// Create history API routes
pub fn create_history_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_history).delete(clear_history))
        .route("/export", get(export_history))
}

/// Every completed session in insertion order
pub async fn list_history(State(state): State<AppState>) -> Json<Vec<SessionRecord>> {
    Json(state.registry.recorder().history().await)
}

/// Download the history as CSV
pub async fn export_history(State(state): State<AppState>) -> Response {
    let body = state.registry.recorder().export_csv().await;
    let disposition = format!("attachment; filename=\"{}\"", state.export_filename);

    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Wipe the history
pub async fn clear_history(State(state): State<AppState>) -> StatusCode {
    state.registry.clear_history().await;
    StatusCode::NO_CONTENT
}
