//! Broker error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Brokerage API error: {code} - {message}")]
    Api { code: String, message: String },

    #[error("Response decode error: {0}")]
    Decode(String),
}

pub type BrokerResult<T> = Result<T, BrokerError>;
