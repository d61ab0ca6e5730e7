//! Signal state-machine driver.
//!
//! The only component with mutable process state. Owns the two
//! collections of not-yet-terminal signals (`pending_signals`,
//! `queued_executions`) and drives every lifecycle transition:
//! admission, approval, rejection, deferred-queue replay, expiry, and
//! restart recovery.

pub mod error;
pub mod executor;

pub use error::{ExecutorError, ExecutorResult};
pub use executor::{BatchSummary, ExecutorConfig, SignalExecutor, TradeProposal};
