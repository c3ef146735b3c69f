pub mod events;
pub mod stats;
pub mod status;
pub mod thumbnails;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::get,
};
use tracing::error;

use sortbot_db::Database;
use sortbot_types::api::ErrorResponse;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Where the store lives on disk; reported by `/status`.
    pub db_path: PathBuf,
}

/// The read-only dashboard surface. Rendering and charting live in the
/// frontend; this is data only.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status::status))
        .route("/api/events/recent", get(events::recent_events))
        .route("/api/events/{event_id}", get(events::event_detail))
        .route("/api/thumbnail/{image_id}", get(thumbnails::thumbnail))
        .route("/api/stats/daily", get(stats::daily_stats))
        .route("/api/stats/totals", get(stats::total_stats))
        .route("/api/export/csv", get(stats::export_csv))
        .with_state(state)
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn not_found(message: impl Into<String>) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn internal(op: &'static str, err: impl std::fmt::Display) -> ApiError {
    error!("{op} failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{op} failed"),
        }),
    )
}
