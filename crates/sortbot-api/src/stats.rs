use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

use sortbot_db::models::DailyStatRow;
use sortbot_types::models::{DailyStatistic, Metadata, TotalStatistics};

use crate::{ApiError, AppState, internal, not_found};

#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    30
}

pub async fn daily_stats(
    State(state): State<AppState>,
    Query(query): Query<DailyQuery>,
) -> Result<Json<Vec<DailyStatistic>>, ApiError> {
    let days = query.days.min(3650);

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.get_daily_statistics(days))
        .await
        .map_err(|e| internal("daily_stats", e))?
        .map_err(|e| internal("daily_stats", e))?;

    Ok(Json(rows.into_iter().map(into_daily).collect()))
}

pub async fn total_stats(
    State(state): State<AppState>,
) -> Result<Json<TotalStatistics>, ApiError> {
    let db = state.clone();
    let totals = tokio::task::spawn_blocking(move || db.db.get_total_statistics())
        .await
        .map_err(|e| internal("total_stats", e))?
        .map_err(|e| internal("total_stats", e))?;

    Ok(Json(totals))
}

/// The statistics table as a CSV attachment, ascending by date.
pub async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.get_all_statistics())
        .await
        .map_err(|e| internal("export_csv", e))?
        .map_err(|e| internal("export_csv", e))?;

    if rows.is_empty() {
        return Err(not_found("No data to export"));
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in &rows {
        writer
            .serialize(row)
            .map_err(|e| internal("export_csv", e))?;
    }
    let body = writer
        .into_inner()
        .map_err(|e| internal("export_csv", e))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=waste_sorting_stats.csv",
            ),
        ],
        body,
    ))
}

fn into_daily(row: DailyStatRow) -> DailyStatistic {
    let date = row.date.parse::<NaiveDate>().unwrap_or_else(|e| {
        warn!("Corrupt date key '{}': {}", row.date, e);
        NaiveDate::default()
    });
    DailyStatistic {
        date,
        can_count: row.can_count,
        recycling_count: row.recycling_count,
        garbage_count: row.garbage_count,
        total_count: row.total_count,
        token_rewards: row.token_rewards,
        metadata: row.metadata.as_deref().map(Metadata::parse),
    }
}
