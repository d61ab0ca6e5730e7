//! Executor error types.

use thiserror::Error;

use sentinel_core::{CoreError, SignalId};
use sentinel_persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Signal not found: {0}")]
    SignalNotFound(SignalId),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] CoreError),

    #[error("Persistence error: {0}")]
    Store(#[from] PersistenceError),
}

pub type ExecutorResult<T> = Result<T, ExecutorError>;
