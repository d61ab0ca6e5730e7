//! Audit error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Audit sink failure: {0}")]
    Sink(String),
}

pub type AuditResult<T> = Result<T, AuditError>;
