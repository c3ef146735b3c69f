use chrono::Utc;
use rusqlite::{OptionalExtension, params};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use sortbot_types::events::StoreNotification;

use crate::Database;
use crate::error::{Result, StoreError};
use crate::models::UserRow;

use super::metadata_to_text;

/// User ids are the first 16 hex chars of SHA-256(username): stable across
/// reinstalls, so a wiped kiosk keeps crediting the same person.
pub fn user_id_for(username: &str) -> String {
    let digest = Sha256::digest(username.as_bytes());
    hex::encode(digest)[..16].to_string()
}

impl Database {
    /// Register a user. Duplicate usernames are rejected; the UNIQUE
    /// constraint backstops the check-then-insert under concurrent
    /// writers.
    pub fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        settings: Option<&Map<String, Value>>,
    ) -> Result<String> {
        const OP: &str = "create_user";

        if username.is_empty() {
            return Err(StoreError::validation(OP, "username must not be empty"));
        }
        let settings_text = metadata_to_text(OP, settings)?;

        let user_id = user_id_for(username);
        let created_at = Utc::now().to_rfc3339();

        self.with_conn(|conn| {
            let taken: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE username = ?1",
                    [username],
                    |row| row.get(0),
                )
                .optional()
                .map_err(StoreError::storage(OP))?;
            if taken.is_some() {
                return Err(StoreError::AlreadyExists {
                    username: username.to_string(),
                });
            }

            match conn.execute(
                "INSERT INTO users (id, username, email, created_at, settings)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, username, email, created_at, settings_text],
            ) {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::AlreadyExists {
                        username: username.to_string(),
                    })
                }
                Err(e) => Err(StoreError::Storage { op: OP, source: e }),
            }
        })?;

        self.notify(StoreNotification::UserCreated {
            user_id: user_id.clone(),
            username: username.to_string(),
        });

        Ok(user_id)
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        const OP: &str = "get_user";

        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, email, token_balance, created_at, last_login, settings
                 FROM users WHERE username = ?1",
                [username],
                map_user_row,
            )
            .optional()
            .map_err(StoreError::storage(OP))
        })
    }

    pub fn get_user_by_id(&self, user_id: &str) -> Result<Option<UserRow>> {
        const OP: &str = "get_user_by_id";

        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, email, token_balance, created_at, last_login, settings
                 FROM users WHERE id = ?1",
                [user_id],
                map_user_row,
            )
            .optional()
            .map_err(StoreError::storage(OP))
        })
    }

    /// Stamp `last_login`; the rewards UI calls this on every login.
    pub fn touch_user_login(&self, username: &str) -> Result<()> {
        const OP: &str = "touch_user_login";

        let changed = self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_login = ?1 WHERE username = ?2",
                params![Utc::now().to_rfc3339(), username],
            )
            .map_err(StoreError::storage(OP))
        })?;

        if changed == 0 {
            return Err(StoreError::not_found("user", username));
        }
        Ok(())
    }

    /// Authoritative balance from the user row, not recomputed from the
    /// ledger on every read.
    pub fn get_user_balance(&self, user_id: &str) -> Result<f64> {
        const OP: &str = "get_user_balance";

        self.with_conn(|conn| {
            conn.query_row(
                "SELECT token_balance FROM users WHERE id = ?1",
                [user_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::storage(OP))?
            .ok_or_else(|| StoreError::not_found("user", user_id))
        })
    }
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        token_balance: row.get(3)?,
        created_at: row.get(4)?,
        last_login: row.get(5)?,
        settings: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_username_is_already_exists() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("alice", None, None).unwrap();

        let err = db.create_user("alice", None, None).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        // Still exactly one alice.
        let alice = db.get_user("alice").unwrap().unwrap();
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.id, user_id_for("alice"));
    }

    #[test]
    fn test_user_id_is_deterministic() {
        assert_eq!(user_id_for("alice"), user_id_for("alice"));
        assert_ne!(user_id_for("alice"), user_id_for("bob"));
        assert_eq!(user_id_for("alice").len(), 16);
    }

    #[test]
    fn test_new_user_starts_at_zero_balance() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_user("carol", Some("carol@example.com"), None).unwrap();
        assert_eq!(db.get_user_balance(&id).unwrap(), 0.0);
    }

    #[test]
    fn test_touch_login_stamps_last_login() {
        let db = Database::open_in_memory().unwrap();
        db.create_user("dave", None, None).unwrap();
        assert!(db.get_user("dave").unwrap().unwrap().last_login.is_none());

        db.touch_user_login("dave").unwrap();
        assert!(db.get_user("dave").unwrap().unwrap().last_login.is_some());

        assert!(db.touch_user_login("nobody").unwrap_err().is_not_found());
    }
}
