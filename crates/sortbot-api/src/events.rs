use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use sortbot_db::models::EventRow;
use sortbot_types::api::EventSummary;
use sortbot_types::models::{Destination, ItemCategory, Metadata, SortEvent};

use crate::{ApiError, AppState, internal, not_found};

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn recent_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Result<Json<Vec<EventSummary>>, ApiError> {
    let limit = query.limit.min(200);

    // Run blocking store reads off the async runtime
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_recent_events(limit))
        .await
        .map_err(|e| internal("recent_events", e))?
        .map_err(|e| internal("recent_events", e))?;

    let events = rows
        .into_iter()
        .map(|row| {
            let timestamp = parse_timestamp(&row.timestamp, &row.id);
            EventSummary {
                id: parse_id(&row.id),
                timestamp,
                formatted_time: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                category: ItemCategory::parse(&row.item_type),
                confidence: row.confidence,
                destination: parse_destination(&row.sort_destination, &row.id),
                image_id: row.image_id.as_deref().map(parse_id),
            }
        })
        .collect();

    Ok(Json(events))
}

pub async fn event_detail(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<SortEvent>, ApiError> {
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.get_event(event_id))
        .await
        .map_err(|e| internal("event_detail", e))?
        .map_err(|e| {
            if e.is_not_found() {
                not_found("Event not found")
            } else {
                internal("event_detail", e)
            }
        })?;

    Ok(Json(into_detail(row)))
}

pub(crate) fn into_detail(row: EventRow) -> SortEvent {
    SortEvent {
        id: parse_id(&row.id),
        timestamp: parse_timestamp(&row.timestamp, &row.id),
        category: ItemCategory::parse(&row.item_type),
        confidence: row.confidence,
        destination: parse_destination(&row.sort_destination, &row.id),
        image_id: row.image_id.as_deref().map(parse_id),
        user_id: row.user_id,
        metadata: row.metadata.as_deref().map(Metadata::parse),
    }
}

fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

fn parse_destination(raw: &str, id: &str) -> Destination {
    Destination::parse(raw).unwrap_or_else(|| {
        warn!("Corrupt sort_destination '{}' on event '{}'", raw, id);
        Destination::Garbage
    })
}

pub(crate) fn parse_timestamp(raw: &str, id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite-style "YYYY-MM-DD HH:MM:SS" without timezone: treat as UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on event '{}': {}", raw, id, e);
            DateTime::default()
        })
}
