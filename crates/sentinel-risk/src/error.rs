//! Risk error types.

use thiserror::Error;

use crate::gates::GateName;

#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Risk gate blocked: {gate} - {reason}")]
    GateBlocked { gate: GateName, reason: String },

    #[error("Account snapshot unavailable: {0}")]
    SnapshotUnavailable(String),
}

pub type RiskResult<T> = Result<T, RiskError>;
