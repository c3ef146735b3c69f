use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use serde_json::{Map, Value};
use uuid::Uuid;

use sortbot_types::events::StoreNotification;
use sortbot_types::models::{Destination, ItemCategory};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::EventRow;
use crate::thumbnail;

use super::metadata_to_text;

impl Database {
    /// Record one physical sort action.
    ///
    /// The optional captured frame is stored and linked before the event
    /// row goes in, and today's statistics row is upserted in the same
    /// transaction, so a failure partway leaves nothing behind.
    /// An unrecognized category still produces an event row but skips the
    /// daily counters.
    pub fn record_event(
        &self,
        category: ItemCategory,
        confidence: f64,
        destination: Destination,
        image: Option<&[u8]>,
        user_id: Option<&str>,
        metadata: Option<&Map<String, Value>>,
    ) -> Result<Uuid> {
        const OP: &str = "record_event";

        if !(0.0..=1.0).contains(&confidence) {
            return Err(StoreError::validation(
                OP,
                format!("confidence {confidence} outside [0, 1]"),
            ));
        }
        let metadata_text = metadata_to_text(OP, metadata)?;

        let event_id = Uuid::new_v4();
        let now = Utc::now();

        // Thumbnail generation can reject undecodable bytes; run it before
        // the transaction so a bad frame leaves no partial writes.
        let image_payload = image
            .map(|bytes| thumbnail::make_thumbnail(bytes).map(|thumb| (Uuid::new_v4(), bytes, thumb)))
            .transpose()?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction().map_err(StoreError::storage(OP))?;

            let image_id = match &image_payload {
                Some((image_id, bytes, thumb)) => {
                    let image_meta = serde_json::json!({
                        "source": "sort_event",
                        "event_id": event_id,
                    })
                    .to_string();
                    super::images::insert_image(
                        &tx,
                        OP,
                        image_id,
                        &now.to_rfc3339(),
                        bytes,
                        thumb,
                        Some(&image_meta),
                    )?;
                    Some(image_id.to_string())
                }
                None => None,
            };

            super::stats::bump_daily_counter(&tx, OP, Database::today(), &category)?;

            tx.execute(
                "INSERT INTO sort_events
                     (id, timestamp, item_type, confidence, sort_destination, image_id, user_id, metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    event_id.to_string(),
                    now.to_rfc3339(),
                    category.as_str(),
                    confidence,
                    destination.as_str(),
                    image_id,
                    user_id,
                    metadata_text,
                ],
            )
            .map_err(StoreError::storage(OP))?;

            tx.commit().map_err(StoreError::storage(OP))
        })?;

        self.notify(StoreNotification::EventRecorded {
            event_id,
            category,
            destination,
        });

        Ok(event_id)
    }

    pub fn get_event(&self, id: Uuid) -> Result<EventRow> {
        const OP: &str = "get_event";

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, item_type, confidence, sort_destination,
                            image_id, user_id, metadata
                     FROM sort_events WHERE id = ?1",
                )
                .map_err(StoreError::storage(OP))?;

            stmt.query_row([id.to_string()], map_event_row)
                .optional()
                .map_err(StoreError::storage(OP))?
                .ok_or_else(|| StoreError::not_found("sort event", id.to_string()))
        })
    }

    /// Most recent events first. Finite snapshot, not a cursor.
    pub fn list_recent_events(&self, limit: u32) -> Result<Vec<EventRow>> {
        const OP: &str = "list_recent_events";

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, item_type, confidence, sort_destination,
                            image_id, user_id, metadata
                     FROM sort_events ORDER BY timestamp DESC LIMIT ?1",
                )
                .map_err(StoreError::storage(OP))?;

            collect_events(&mut stmt, params![limit], OP)
        })
    }

    /// Events strictly newer than `after` (an RFC 3339 timestamp),
    /// ascending. This is the uploader's batch read.
    pub fn get_events_after(&self, after: &str, limit: u32) -> Result<Vec<EventRow>> {
        const OP: &str = "get_events_after";

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, item_type, confidence, sort_destination,
                            image_id, user_id, metadata
                     FROM sort_events WHERE timestamp > ?1
                     ORDER BY timestamp ASC LIMIT ?2",
                )
                .map_err(StoreError::storage(OP))?;

            collect_events(&mut stmt, params![after, limit], OP)
        })
    }
}

fn collect_events(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
    op: &'static str,
) -> Result<Vec<EventRow>> {
    let rows = stmt
        .query_map(params, map_event_row)
        .map_err(StoreError::storage(op))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(StoreError::storage(op))?;
    Ok(rows)
}

fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        item_type: row.get(2)?,
        confidence: row.get(3)?,
        sort_destination: row.get(4)?,
        image_id: row.get(5)?,
        user_id: row.get(6)?,
        metadata: row.get(7)?,
    })
}
