use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use tracing::{error, info, warn};

use sortbot_db::Database;
use sortbot_db::models::{DailyStatRow, EventRow};
use sortbot_types::api::{UploadAck, UploadEvent, UploadPayload, UploadStat};
use sortbot_types::models::Metadata;

use crate::config::UploadConfig;
use crate::error::UploadError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("sortbot-uploader/", env!("CARGO_PKG_VERSION"));

pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("cannot build HTTP client")
}

/// One upload cycle: read the window past the watermark, POST it with
/// bounded retries, and advance the watermark only after the server
/// confirmed. Returns whether the cycle succeeded.
pub async fn run_cycle(
    client: &Client,
    db: &Database,
    config: &mut UploadConfig,
    config_path: &Path,
    force: bool,
) -> Result<bool> {
    let events = db
        .get_events_after(&config.last_upload_time, config.max_events_per_upload)
        .context("cannot read events past watermark")?;

    if events.is_empty() && !force {
        info!("No new events to upload (watermark {})", config.last_upload_time);
        return Ok(true);
    }

    let stats = db.get_all_statistics().context("cannot read statistics")?;
    info!(
        "Uploading to {}: {} events, {} stat rows",
        config.server_url,
        events.len(),
        stats.len()
    );

    let payload = build_payload(&config.api_key, &events, &stats);

    let mut succeeded = false;
    for attempt in 1..=config.retry_attempts {
        if attempt > 1 {
            info!("Retry attempt {}/{}", attempt, config.retry_attempts);
            tokio::time::sleep(Duration::from_secs(config.retry_delay_seconds)).await;
        }

        match send(client, &config.server_url, &payload).await {
            Ok(message) => {
                info!("Upload successful: {}", message.unwrap_or_else(|| "no message".into()));
                succeeded = true;
                break;
            }
            Err(e) => error!("Upload attempt {} failed: {}", attempt, e),
        }
    }

    if !succeeded {
        // Watermark untouched; the same window goes out next cycle.
        warn!("Upload failed after {} attempts", config.retry_attempts);
        return Ok(false);
    }

    config.last_upload_time = next_watermark(&events);
    config.save(config_path)?;
    info!(
        "Upload complete: {} events, {} stats; watermark now {}",
        events.len(),
        stats.len(),
        config.last_upload_time
    );
    Ok(true)
}

async fn send(client: &Client, url: &str, payload: &UploadPayload) -> Result<Option<String>, UploadError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(UploadError::from_request)?;

    let status = response.status();
    if !status.is_success() {
        return Err(UploadError::Status(status));
    }

    let ack: UploadAck = response.json().await.map_err(UploadError::ResponseParse)?;
    if ack.success {
        Ok(ack.message)
    } else {
        Err(UploadError::Rejected(
            ack.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

fn build_payload(api_key: &str, events: &[EventRow], stats: &[DailyStatRow]) -> UploadPayload {
    UploadPayload {
        api_key: api_key.to_string(),
        timestamp: Utc::now(),
        events: events
            .iter()
            .map(|row| UploadEvent {
                id: row.id.clone(),
                timestamp: row.timestamp.clone(),
                item_type: row.item_type.clone(),
                confidence: row.confidence,
                sort_destination: row.sort_destination.clone(),
                image_id: row.image_id.clone(),
                user_id: row.user_id.clone(),
                metadata: row.metadata.as_deref().map(Metadata::parse),
            })
            .collect(),
        stats: stats
            .iter()
            .map(|row| UploadStat {
                date: row.date.clone(),
                can_count: row.can_count,
                recycling_count: row.recycling_count,
                garbage_count: row.garbage_count,
                total_count: row.total_count,
                token_rewards: row.token_rewards,
                metadata: row.metadata.as_deref().map(Metadata::parse),
            })
            .collect(),
    }
}

/// The batch read is ascending, so the last event carries the newest
/// timestamp. An empty forced upload just stamps "now".
fn next_watermark(events: &[EventRow]) -> String {
    events
        .last()
        .map(|event| event.timestamp.clone())
        .unwrap_or_else(|| Utc::now().to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_row(id: &str, timestamp: &str) -> EventRow {
        EventRow {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            item_type: "can".to_string(),
            confidence: 0.9,
            sort_destination: "recycling".to_string(),
            image_id: None,
            user_id: None,
            metadata: Some(r#"{"source":"auto_sort"}"#.to_string()),
        }
    }

    #[test]
    fn test_watermark_is_newest_event_timestamp() {
        let events = vec![
            event_row("a", "2025-06-01T10:00:00+00:00"),
            event_row("b", "2025-06-01T11:30:00+00:00"),
        ];
        assert_eq!(next_watermark(&events), "2025-06-01T11:30:00+00:00");
    }

    #[test]
    fn test_payload_shape_matches_wire_format() {
        let events = vec![event_row("a", "2025-06-01T10:00:00+00:00")];
        let stats = vec![DailyStatRow {
            date: "2025-06-01".to_string(),
            can_count: 1,
            recycling_count: 0,
            garbage_count: 0,
            total_count: 1,
            token_rewards: 1.0,
            metadata: None,
        }];

        let payload = build_payload("secret", &events, &stats);
        let json: serde_json::Value = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["api_key"], "secret");
        assert_eq!(json["events"][0]["item_type"], "can");
        // Parseable metadata goes over the wire as an object, not a string.
        assert_eq!(json["events"][0]["metadata"]["source"], "auto_sort");
        assert_eq!(json["stats"][0]["total_count"], 1);
    }

    #[tokio::test]
    async fn test_empty_window_is_a_successful_no_op() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload_config.json");

        let mut config = UploadConfig::default();
        let before = config.last_upload_time.clone();

        // Nothing past the watermark: no request is made, nothing advances.
        let client = build_client().unwrap();
        let succeeded = run_cycle(&client, &db, &mut config, &path, false).await.unwrap();
        assert!(succeeded);
        assert_eq!(config.last_upload_time, before);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_cycle_leaves_watermark_untouched() {
        use sortbot_types::models::{Destination, ItemCategory};

        let db = Database::open_in_memory().unwrap();
        db.record_event(ItemCategory::Can, 0.9, Destination::Recycling, None, None, None)
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload_config.json");

        let mut config = UploadConfig {
            // Port 9 (discard) refuses connections on any sane machine.
            server_url: "http://127.0.0.1:9/upload_data.php".to_string(),
            retry_attempts: 2,
            retry_delay_seconds: 0,
            last_upload_time: "2020-01-01T00:00:00+00:00".to_string(),
            ..UploadConfig::default()
        };
        config.save(&path).unwrap();

        let client = build_client().unwrap();
        let succeeded = run_cycle(&client, &db, &mut config, &path, false).await.unwrap();
        assert!(!succeeded);
        assert_eq!(config.last_upload_time, "2020-01-01T00:00:00+00:00");

        let on_disk = UploadConfig::load_or_create(&path).unwrap();
        assert_eq!(on_disk.last_upload_time, "2020-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_ack_parses_both_shapes() {
        let ok: UploadAck =
            serde_json::from_str(r#"{"success":true,"message":"stored 3 events"}"#).unwrap();
        assert!(ok.success);
        assert_eq!(ok.message.as_deref(), Some("stored 3 events"));

        let rejected: UploadAck =
            serde_json::from_str(r#"{"success":false,"error":"bad api key"}"#).unwrap();
        assert!(!rejected.success);
        assert_eq!(rejected.error.as_deref(), Some("bad api key"));
    }
}
