use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} limit of {limit} reached")]
    LimitExceeded { entity: &'static str, limit: usize },

    /// The in-memory state changed but could not be written to the backing file.
    #[error("snapshot to {} failed: {source}", path.display())]
    Durability {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("content codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("row mapping failed for {table}: {reason}")]
    Mapping { table: &'static str, reason: String },

    #[error("engine lock poisoned")]
    LockPoisoned,
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        DbError::Validation(reason.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}
