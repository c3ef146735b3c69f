mod backup;
mod events;
mod images;
mod stats;
mod tokens;
mod users;

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Serialize caller-supplied metadata for storage. A map that cannot be
/// serialized fails the whole call; metadata is never silently dropped.
pub(crate) fn metadata_to_text(
    op: &'static str,
    metadata: Option<&Map<String, Value>>,
) -> Result<Option<String>> {
    metadata
        .map(|map| {
            serde_json::to_string(map)
                .map_err(|e| StoreError::validation(op, format!("metadata not serializable: {e}")))
        })
        .transpose()
}
