//! Error types for sentinel-core.

use thiserror::Error;

use crate::signal::SignalStatus;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Illegal status transition: {from} -> {to}")]
    InvalidTransition {
        from: SignalStatus,
        to: SignalStatus,
    },

    #[error("Unknown signal status: {0}")]
    UnknownStatus(String),

    #[error("Unknown trade action: {0}")]
    UnknownAction(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
