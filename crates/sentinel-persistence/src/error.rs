//! Persistence error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row for signal {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;
