use rusqlite::Connection;
use tracing::info;

use crate::error::{Result, StoreError};

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sort_events (
            id                  TEXT PRIMARY KEY,
            timestamp           TEXT NOT NULL,
            item_type           TEXT NOT NULL,
            confidence          REAL NOT NULL,
            sort_destination    TEXT NOT NULL,
            image_id            TEXT REFERENCES images(id),
            user_id             TEXT REFERENCES users(id),
            metadata            TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_sort_events_timestamp
            ON sort_events(timestamp);

        CREATE TABLE IF NOT EXISTS images (
            id          TEXT PRIMARY KEY,
            timestamp   TEXT NOT NULL,
            image_data  BLOB NOT NULL,
            thumbnail   BLOB NOT NULL,
            metadata    TEXT
        );

        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            email           TEXT,
            token_balance   REAL NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            last_login      TEXT,
            settings        TEXT
        );

        CREATE TABLE IF NOT EXISTS token_transactions (
            id                  TEXT PRIMARY KEY,
            timestamp           TEXT NOT NULL,
            user_id             TEXT NOT NULL REFERENCES users(id),
            amount              REAL NOT NULL,
            transaction_type    TEXT NOT NULL,
            reference_id        TEXT,
            metadata            TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_token_transactions_user
            ON token_transactions(user_id, timestamp);

        -- One row per UTC calendar date, counters only ever incremented.
        CREATE TABLE IF NOT EXISTS statistics (
            date            TEXT PRIMARY KEY,
            can_count       INTEGER NOT NULL DEFAULT 0,
            recycling_count INTEGER NOT NULL DEFAULT 0,
            garbage_count   INTEGER NOT NULL DEFAULT 0,
            total_count     INTEGER NOT NULL DEFAULT 0,
            token_rewards   REAL NOT NULL DEFAULT 0,
            metadata        TEXT
        );
        ",
    )
    .map_err(StoreError::storage("migrations"))?;

    info!("Database migrations complete");
    Ok(())
}
