pub mod error;
pub mod migrations;
pub mod models;
pub mod notify;
pub mod thumbnail;

mod queries;

use std::path::Path;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use crossbeam_channel::Receiver;
use rusqlite::Connection;
use tracing::info;

use sortbot_types::events::StoreNotification;

pub use error::{Result, StoreError};

use notify::Notifier;

/// Single-writer handle to the sorting database.
///
/// One `Database` is constructed at process start and passed to every
/// collaborator that needs it. The dashboard runs as a separate process
/// against the same file and relies on SQLite's own locking; WAL mode
/// keeps its reads from blocking the writer.
pub struct Database {
    conn: Mutex<Connection>,
    notifier: Notifier,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::io("open"))?;
            }
        }

        let conn = Connection::open(path).map_err(StoreError::storage("open"))?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(StoreError::storage("open"))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(StoreError::storage("open"))?;

        migrations::run(&conn)?;

        info!("Sorting database opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            notifier: Notifier::new(),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::storage("open"))?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            notifier: Notifier::new(),
        })
    }

    /// Subscribe to store mutation notifications. The store holds no
    /// references to its observers; dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> Receiver<StoreNotification> {
        self.notifier.subscribe()
    }

    pub(crate) fn notify(&self, note: StoreNotification) {
        self.notifier.publish(note);
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        f(&mut conn)
    }

    /// Date key for "today". UTC everywhere: the rig and the dashboard may
    /// sit in different timezones, and a single policy keeps every event
    /// in exactly one statistics row.
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}
