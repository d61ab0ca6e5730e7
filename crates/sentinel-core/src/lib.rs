//! Core domain types for the sentinel signal pipeline.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Signal`: A proposed trade moving through admission control
//! - `SignalStatus`: Forward-only lifecycle state machine
//! - `Price`, `Amount`: Precision-safe numeric types
//! - `AccountSnapshot`: Point-in-time brokerage account state
//! - `SignalEvent`: Append-only audit record

pub mod account;
pub mod decimal;
pub mod error;
pub mod event;
pub mod signal;

pub use account::AccountSnapshot;
pub use decimal::{Amount, Price};
pub use error::{CoreError, Result};
pub use event::{AuditEventType, SignalEvent};
pub use signal::{OrderSide, Signal, SignalId, SignalStatus, TradeAction};

use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
