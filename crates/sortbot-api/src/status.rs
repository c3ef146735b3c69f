use axum::{Json, extract::State};
use chrono::Utc;

use sortbot_types::api::StatusResponse;

use crate::AppState;

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online".to_string(),
        database: state.db_path.exists(),
        timestamp: Utc::now(),
    })
}
