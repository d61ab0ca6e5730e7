//! Signal lifecycle types.
//!
//! A `Signal` is a proposed trade produced by the upstream analysis agents.
//! It moves through a forward-only status graph; terminal states are sinks
//! and every transition is validated by `SignalStatus::can_transition_to`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;
use crate::{Amount, Price};

/// Unique signal identifier.
///
/// Format: `sig_{timestamp_ms}_{uuid_short}`. Stable from creation,
/// used as the primary key in durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalId(String);

impl SignalId {
    /// Create a new unique signal ID.
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("sig_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for rows read back from storage).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SignalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade intent of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    /// Map to an order side. `Hold` never becomes an order.
    #[must_use]
    pub fn order_side(&self) -> Option<OrderSide> {
        match self {
            Self::Buy => Some(OrderSide::Buy),
            Self::Sell => Some(OrderSide::Sell),
            Self::Hold => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "HOLD" => Ok(Self::Hold),
            other => Err(CoreError::UnknownAction(other.to_string())),
        }
    }
}

/// Side of a brokerage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Lifecycle state of a signal.
///
/// Transitions are strictly forward:
/// `Pending → {Approved, Rejected}`, `Approved → {Executed, Queued}`,
/// `Queued → {AutoExecuted, Cancelled}`. `Rejected`, `Executed`,
/// `AutoExecuted`, `Cancelled` and `Expired` are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    /// Awaiting an approve/reject decision.
    Pending,
    /// Approved; order not yet placed (or never placed, for HOLD).
    Approved,
    /// Rejected before any order was placed.
    Rejected,
    /// Order placed and accepted during an approve call.
    Executed,
    /// Approved but deferred: market closed or placement failed.
    Queued,
    /// Order placed and accepted by the queue replay driver.
    AutoExecuted,
    /// Removed from the queue without execution (e.g. insufficient funds).
    Cancelled,
    /// Aged out while still pending.
    Expired,
}

impl SignalStatus {
    /// Returns true if the status is a sink.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Rejected | Self::Executed | Self::AutoExecuted | Self::Cancelled | Self::Expired
        )
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// Terminal states accept no transition; nothing moves backward.
    #[must_use]
    pub fn can_transition_to(&self, next: SignalStatus) -> bool {
        match self {
            Self::Pending => matches!(
                next,
                Self::Approved | Self::Rejected | Self::Expired
            ),
            Self::Approved => matches!(next, Self::Executed | Self::Queued),
            Self::Queued => matches!(next, Self::AutoExecuted | Self::Cancelled),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Queued => "queued",
            Self::AutoExecuted => "auto_executed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "executed" => Ok(Self::Executed),
            "queued" => Ok(Self::Queued),
            "auto_executed" => Ok(Self::AutoExecuted),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// A proposed trade moving through admission control and execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Stable identity, assigned at creation.
    pub id: SignalId,
    /// Ticker symbol.
    pub symbol: String,
    /// Human-readable company name.
    pub company_name: String,
    /// Trade intent.
    pub action: TradeAction,
    /// Number of shares proposed.
    pub suggested_quantity: u32,
    /// Currency budget for the trade.
    pub suggested_amount: Amount,
    /// Take-profit target, clamped at admission.
    pub target_price: Price,
    /// Stop-loss price, clamped at admission.
    pub stop_loss: Price,
    /// Aggregate confidence of the analysis agents (0.0–1.0).
    pub confidence: f64,
    /// Quant agent score (1–10).
    pub quant_score: f64,
    /// Fundamental agent score (1–10).
    pub fundamental_score: f64,
    /// Which upstream process proposed the trade (e.g. "news").
    pub trigger_source: String,
    /// Current lifecycle state.
    pub status: SignalStatus,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
    /// Set when an order was accepted by the brokerage.
    pub executed_at: Option<DateTime<Utc>>,
    /// Brokerage order number, set on successful placement.
    pub order_no: Option<String>,
}

impl Signal {
    /// Advance the lifecycle, rejecting illegal transitions.
    ///
    /// This is the only mutation path for `status`; callers never assign
    /// the field directly.
    pub fn transition_to(&mut self, next: SignalStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Record a successful order placement.
    pub fn mark_placed(&mut self, order_no: Option<String>, at: DateTime<Utc>) {
        self.executed_at = Some(at);
        self.order_no = order_no;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_signal(status: SignalStatus) -> Signal {
        Signal {
            id: SignalId::new(),
            symbol: "005930".to_string(),
            company_name: "Samsung Electronics".to_string(),
            action: TradeAction::Buy,
            suggested_quantity: 10,
            suggested_amount: Amount::new(dec!(700000)),
            target_price: Price::new(dec!(84000)),
            stop_loss: Price::new(dec!(66500)),
            confidence: 0.8,
            quant_score: 7.0,
            fundamental_score: 8.0,
            trigger_source: "news".to_string(),
            status,
            created_at: Utc::now(),
            executed_at: None,
            order_no: None,
        }
    }

    #[test]
    fn test_forward_transitions_allowed() {
        let mut signal = sample_signal(SignalStatus::Pending);
        assert!(signal.transition_to(SignalStatus::Approved).is_ok());
        assert!(signal.transition_to(SignalStatus::Queued).is_ok());
        assert!(signal.transition_to(SignalStatus::AutoExecuted).is_ok());
    }

    #[test]
    fn test_terminal_states_are_sinks() {
        for terminal in [
            SignalStatus::Rejected,
            SignalStatus::Executed,
            SignalStatus::AutoExecuted,
            SignalStatus::Cancelled,
            SignalStatus::Expired,
        ] {
            assert!(terminal.is_terminal());
            let mut signal = sample_signal(terminal);
            assert!(signal.transition_to(SignalStatus::Pending).is_err());
            assert!(signal.transition_to(SignalStatus::Queued).is_err());
        }
    }

    #[test]
    fn test_no_backward_transition() {
        let mut signal = sample_signal(SignalStatus::Queued);
        assert!(signal.transition_to(SignalStatus::Pending).is_err());
        assert!(signal.transition_to(SignalStatus::Approved).is_err());
    }

    #[test]
    fn test_skipping_to_auto_executed_from_pending_is_illegal() {
        let mut signal = sample_signal(SignalStatus::Pending);
        assert!(signal.transition_to(SignalStatus::AutoExecuted).is_err());
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [
            SignalStatus::Pending,
            SignalStatus::Approved,
            SignalStatus::Rejected,
            SignalStatus::Executed,
            SignalStatus::Queued,
            SignalStatus::AutoExecuted,
            SignalStatus::Cancelled,
            SignalStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<SignalStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_hold_has_no_order_side() {
        assert_eq!(TradeAction::Hold.order_side(), None);
        assert_eq!(TradeAction::Buy.order_side(), Some(OrderSide::Buy));
        assert_eq!(TradeAction::Sell.order_side(), Some(OrderSide::Sell));
    }
}
