use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure taxonomy for store operations.
///
/// Every variant carries the operation name or key involved so callers can
/// log something a human operator can act on. The only conditions the
/// store swallows are the two documented no-ops: unrecognized categories
/// skip the daily counters, and metadata that fails to parse is returned
/// as its raw string.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("username already exists: {username}")]
    AlreadyExists { username: String },

    #[error("{op}: {reason}")]
    Validation { op: &'static str, reason: String },

    #[error("database failure in {op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("io failure in {op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("store lock poisoned")]
    Poisoned,
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        StoreError::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn validation(op: &'static str, reason: impl Into<String>) -> Self {
        StoreError::Validation {
            op,
            reason: reason.into(),
        }
    }

    /// Adapter for `map_err` on rusqlite calls: `.map_err(storage("get_event"))`.
    pub(crate) fn storage(op: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
        move |source| StoreError::Storage { op, source }
    }

    pub(crate) fn io(op: &'static str) -> impl FnOnce(std::io::Error) -> StoreError {
        move |source| StoreError::Io { op, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
