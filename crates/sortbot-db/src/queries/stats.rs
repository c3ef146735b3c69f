use chrono::NaiveDate;
use rusqlite::{Connection, params};
use tracing::debug;

use sortbot_types::models::{ItemCategory, TotalStatistics};

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::DailyStatRow;

/// Increment the counter for `category` (and `total_count`) on `date`,
/// creating the row with zero counters if absent. An unrecognized
/// category is a documented no-op, not an error.
pub(crate) fn bump_daily_counter(
    conn: &Connection,
    op: &'static str,
    date: NaiveDate,
    category: &ItemCategory,
) -> Result<()> {
    let column = match category {
        ItemCategory::Can => "can_count",
        ItemCategory::Recycling => "recycling_count",
        ItemCategory::Garbage => "garbage_count",
        ItemCategory::Unrecognized(raw) => {
            debug!("unrecognized category '{}': daily counters unchanged", raw);
            return Ok(());
        }
    };

    let date_key = date.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO statistics (date) VALUES (?1)",
        [&date_key],
    )
    .map_err(StoreError::storage(op))?;

    // Column name comes from the match above, never from input.
    conn.execute(
        &format!(
            "UPDATE statistics SET {column} = {column} + 1, total_count = total_count + 1
             WHERE date = ?1"
        ),
        [&date_key],
    )
    .map_err(StoreError::storage(op))?;

    Ok(())
}

/// Adjust `token_rewards` on `date` by `amount`, creating the row if
/// absent.
pub(crate) fn bump_token_rewards(
    conn: &Connection,
    op: &'static str,
    date: NaiveDate,
    amount: f64,
) -> Result<()> {
    let date_key = date.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO statistics (date) VALUES (?1)",
        [&date_key],
    )
    .map_err(StoreError::storage(op))?;

    conn.execute(
        "UPDATE statistics SET token_rewards = token_rewards + ?1 WHERE date = ?2",
        params![amount, date_key],
    )
    .map_err(StoreError::storage(op))?;

    Ok(())
}

impl Database {
    pub fn upsert_daily_counter(&self, date: NaiveDate, category: &ItemCategory) -> Result<()> {
        self.with_conn(|conn| bump_daily_counter(conn, "upsert_daily_counter", date, category))
    }

    /// The most recent `days` statistics rows, ascending by date.
    pub fn get_daily_statistics(&self, days: u32) -> Result<Vec<DailyStatRow>> {
        const OP: &str = "get_daily_statistics";

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT date, can_count, recycling_count, garbage_count, total_count,
                            token_rewards, metadata
                     FROM statistics ORDER BY date DESC LIMIT ?1",
                )
                .map_err(StoreError::storage(OP))?;

            let mut rows = stmt
                .query_map(params![days], map_stat_row)
                .map_err(StoreError::storage(OP))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(StoreError::storage(OP))?;

            rows.reverse();
            Ok(rows)
        })
    }

    /// All statistics rows, ascending by date; the CSV export and the
    /// uploader send the whole table.
    pub fn get_all_statistics(&self) -> Result<Vec<DailyStatRow>> {
        const OP: &str = "get_all_statistics";

        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT date, can_count, recycling_count, garbage_count, total_count,
                            token_rewards, metadata
                     FROM statistics ORDER BY date ASC",
                )
                .map_err(StoreError::storage(OP))?;

            let rows = stmt
                .query_map([], map_stat_row)
                .map_err(StoreError::storage(OP))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(StoreError::storage(OP))?;
            Ok(rows)
        })
    }

    /// Aggregate sums across every statistics row; zero-valued defaults on
    /// an empty store.
    pub fn get_total_statistics(&self) -> Result<TotalStatistics> {
        const OP: &str = "get_total_statistics";

        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COALESCE(SUM(can_count), 0),
                        COALESCE(SUM(recycling_count), 0),
                        COALESCE(SUM(garbage_count), 0),
                        COALESCE(SUM(total_count), 0),
                        COALESCE(SUM(token_rewards), 0)
                 FROM statistics",
                [],
                |row| {
                    Ok(TotalStatistics {
                        total_cans: row.get(0)?,
                        total_recycling: row.get(1)?,
                        total_garbage: row.get(2)?,
                        grand_total: row.get(3)?,
                        total_rewards: row.get(4)?,
                    })
                },
            )
            .map_err(StoreError::storage(OP))
        })
    }
}

fn map_stat_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DailyStatRow> {
    Ok(DailyStatRow {
        date: row.get(0)?,
        can_count: row.get(1)?,
        recycling_count: row.get(2)?,
        garbage_count: row.get(3)?,
        total_count: row.get(4)?,
        token_rewards: row.get(5)?,
        metadata: row.get(6)?,
    })
}
