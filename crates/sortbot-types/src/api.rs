use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Destination, ItemCategory, Metadata};

// -- Dashboard --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub database: bool,
    pub timestamp: DateTime<Utc>,
}

/// Row shape of `GET /api/events/recent`, trimmed to what the events
/// table on the dashboard actually renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Timestamp preformatted for the table column.
    pub formatted_time: String,
    #[serde(rename = "item_type")]
    pub category: ItemCategory,
    pub confidence: f64,
    #[serde(rename = "sort_destination")]
    pub destination: Destination,
    pub image_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Upload wire format --
//
// The remote ingestion endpoint dedups on event id, so re-sending an
// unacknowledged window after a failed cycle is harmless.

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadPayload {
    pub api_key: String,
    pub timestamp: DateTime<Utc>,
    pub events: Vec<UploadEvent>,
    pub stats: Vec<UploadStat>,
}

/// Events go over the wire the way they sit in the store: string
/// timestamps, raw category text, metadata parsed when it parses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadEvent {
    pub id: String,
    pub timestamp: String,
    pub item_type: String,
    pub confidence: f64,
    pub sort_destination: String,
    pub image_id: Option<String>,
    pub user_id: Option<String>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStat {
    pub date: String,
    pub can_count: i64,
    pub recycling_count: i64,
    pub garbage_count: i64,
    pub total_count: i64,
    pub token_rewards: f64,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Deserialize)]
pub struct UploadAck {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
