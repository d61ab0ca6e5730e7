//! Append-only audit event types.
//!
//! Every gate decision and lifecycle transition surfaces as a
//! `SignalEvent`. Events are written best-effort and never updated or
//! deleted by this system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::signal::{SignalId, TradeAction};

/// What happened to a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A proposal passed admission and became a pending signal.
    SignalAdmitted,
    /// A gate blocked a proposal.
    GateBlocked,
    /// A pending signal was approved.
    SignalApproved,
    /// A pending signal was rejected.
    SignalRejected,
    /// A signal entered the deferred-execution queue.
    SignalQueued,
    /// An order was accepted during an approve call.
    OrderExecuted,
    /// An order was accepted by the queue replay driver.
    OrderAutoExecuted,
    /// The brokerage rejected or errored an order placement.
    OrderPlacementFailed,
    /// A queued signal was cancelled without execution.
    SignalCancelled,
    /// A pending signal aged out.
    SignalExpired,
    /// In-memory queues were rebuilt from durable storage.
    SignalsRestored,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignalAdmitted => "signal_admitted",
            Self::GateBlocked => "gate_blocked",
            Self::SignalApproved => "signal_approved",
            Self::SignalRejected => "signal_rejected",
            Self::SignalQueued => "signal_queued",
            Self::OrderExecuted => "order_executed",
            Self::OrderAutoExecuted => "order_auto_executed",
            Self::OrderPlacementFailed => "order_placement_failed",
            Self::SignalCancelled => "signal_cancelled",
            Self::SignalExpired => "signal_expired",
            Self::SignalsRestored => "signals_restored",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    /// Subject signal, absent for system-level events (e.g. restore).
    pub signal_id: Option<SignalId>,
    /// Event classification.
    pub event_type: AuditEventType,
    /// Ticker symbol, or a marker like "*" for system-level events.
    pub symbol: String,
    /// Trade intent at the time of the event, when known.
    pub action: Option<TradeAction>,
    /// Structured context (gate name, reason, order number, counts).
    pub details: serde_json::Value,
    /// Event time (UTC).
    pub created_at: DateTime<Utc>,
}

impl SignalEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(
        signal_id: Option<SignalId>,
        event_type: AuditEventType,
        symbol: impl Into<String>,
        action: Option<TradeAction>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            signal_id,
            event_type,
            symbol: symbol.into(),
            action,
            details,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_construction() {
        let id = SignalId::new();
        let event = SignalEvent::new(
            Some(id.clone()),
            AuditEventType::GateBlocked,
            "005930",
            Some(TradeAction::Buy),
            json!({"gate": "A", "reason": "below minimum position size"}),
        );

        assert_eq!(event.signal_id, Some(id));
        assert_eq!(event.event_type, AuditEventType::GateBlocked);
        assert_eq!(event.details["gate"], "A");
    }

    #[test]
    fn test_event_type_strings() {
        assert_eq!(AuditEventType::OrderAutoExecuted.as_str(), "order_auto_executed");
        assert_eq!(AuditEventType::SignalExpired.to_string(), "signal_expired");
    }
}
