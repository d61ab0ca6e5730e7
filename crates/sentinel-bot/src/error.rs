//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Broker error: {0}")]
    Broker(#[from] sentinel_broker::BrokerError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] sentinel_persistence::PersistenceError),

    #[error("Executor error: {0}")]
    Executor(#[from] sentinel_executor::ExecutorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
