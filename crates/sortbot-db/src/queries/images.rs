use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::Database;
use crate::error::{Result, StoreError};
use crate::thumbnail;

use super::metadata_to_text;

/// Shared insert used both by `store_image` and by `record_event`'s
/// transaction (the image row must land before the event that references
/// it).
pub(crate) fn insert_image(
    conn: &Connection,
    op: &'static str,
    id: &Uuid,
    timestamp: &str,
    image_data: &[u8],
    thumbnail: &[u8],
    metadata: Option<&str>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO images (id, timestamp, image_data, thumbnail, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id.to_string(), timestamp, image_data, thumbnail, metadata],
    )
    .map_err(StoreError::storage(op))?;
    Ok(())
}

impl Database {
    /// Store an encoded image and its derived 100x100 thumbnail.
    pub fn store_image(
        &self,
        bytes: &[u8],
        metadata: Option<&Map<String, Value>>,
    ) -> Result<Uuid> {
        const OP: &str = "store_image";

        let metadata_text = metadata_to_text(OP, metadata)?;
        let thumb = thumbnail::make_thumbnail(bytes)?;
        let image_id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            insert_image(conn, OP, &image_id, &now, bytes, &thumb, metadata_text.as_deref())
        })?;

        Ok(image_id)
    }

    /// Full-resolution encoded bytes.
    pub fn get_image(&self, id: Uuid) -> Result<Vec<u8>> {
        const OP: &str = "get_image";

        self.with_conn(|conn| {
            conn.query_row(
                "SELECT image_data FROM images WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::storage(OP))?
            .ok_or_else(|| StoreError::not_found("image", id.to_string()))
        })
    }

    /// The thumbnail derived at store time; never re-derived.
    pub fn get_thumbnail(&self, id: Uuid) -> Result<Vec<u8>> {
        const OP: &str = "get_thumbnail";

        self.with_conn(|conn| {
            conn.query_row(
                "SELECT thumbnail FROM images WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::storage(OP))?
            .ok_or_else(|| StoreError::not_found("image", id.to_string()))
        })
    }
}
