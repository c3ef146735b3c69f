use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::{EventRow, TransactionRow, UserRow};

impl Database {
    /// Dump each logical table as pretty-printed JSON under `dir`.
    ///
    /// Image payloads are deliberately left out of the extract; the
    /// backup is a human-readable record of activity, not a blob archive.
    /// Returns the absolute backup directory.
    pub fn backup(&self, dir: &Path) -> Result<PathBuf> {
        const OP: &str = "backup";

        std::fs::create_dir_all(dir).map_err(StoreError::io(OP))?;

        let events = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, item_type, confidence, sort_destination,
                            image_id, user_id, metadata
                     FROM sort_events ORDER BY timestamp ASC",
                )
                .map_err(StoreError::storage(OP))?;
            let rows = stmt
                .query_map([], |row| {
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
                })
                .map_err(StoreError::storage(OP))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(StoreError::storage(OP))?;
            Ok(rows)
        })?;

        let users = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, username, email, token_balance, created_at, last_login, settings
                     FROM users ORDER BY created_at ASC",
                )
                .map_err(StoreError::storage(OP))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(UserRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        token_balance: row.get(3)?,
                        created_at: row.get(4)?,
                        last_login: row.get(5)?,
                        settings: row.get(6)?,
                    })
                })
                .map_err(StoreError::storage(OP))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(StoreError::storage(OP))?;
            Ok(rows)
        })?;

        let transactions = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, timestamp, user_id, amount, transaction_type, reference_id, metadata
                     FROM token_transactions ORDER BY timestamp ASC",
                )
                .map_err(StoreError::storage(OP))?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(TransactionRow {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        user_id: row.get(2)?,
                        amount: row.get(3)?,
                        transaction_type: row.get(4)?,
                        reference_id: row.get(5)?,
                        metadata: row.get(6)?,
                    })
                })
                .map_err(StoreError::storage(OP))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(StoreError::storage(OP))?;
            Ok(rows)
        })?;

        let statistics = self.get_all_statistics()?;

        write_json(dir, "sort_events.json", &events)?;
        write_json(dir, "users.json", &users)?;
        write_json(dir, "token_transactions.json", &transactions)?;
        write_json(dir, "statistics.json", &statistics)?;

        let resolved = dir.canonicalize().map_err(StoreError::io(OP))?;
        info!(
            "Backed up {} events, {} users, {} transactions, {} stat rows to {}",
            events.len(),
            users.len(),
            transactions.len(),
            statistics.len(),
            resolved.display()
        );
        Ok(resolved)
    }
}

fn write_json<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<()> {
    const OP: &str = "backup";

    let text = serde_json::to_string_pretty(rows)
        .map_err(|e| StoreError::validation(OP, format!("cannot serialize {name}: {e}")))?;
    std::fs::write(dir.join(name), text).map_err(StoreError::io(OP))
}
