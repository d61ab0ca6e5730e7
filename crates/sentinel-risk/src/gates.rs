//! Portfolio risk gate implementation.
//!
//! Gates evaluate in order A → B → C with early return on the first
//! block. Each evaluation consumes an account snapshot read fresh from
//! the brokerage for that call; snapshots are never cached across
//! evaluations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

use sentinel_core::{AccountSnapshot, Amount};

use crate::error::{RiskError, RiskResult};

/// Named admission gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateName {
    /// Minimum position size.
    A,
    /// Cash reserve floor.
    B,
    /// Position count cap.
    C,
    /// Upstream data feed health.
    DataQuality,
}

impl GateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::DataQuality => "data_quality",
        }
    }
}

impl fmt::Display for GateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a single gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Gate passed.
    Pass,
    /// Gate blocked with reason.
    Block(String),
}

impl GateOutcome {
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    #[must_use]
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }
}

/// Portfolio limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Minimum position size as percent of total assets (Gate A).
    #[serde(default = "default_min_position_pct")]
    pub min_position_pct: Decimal,
    /// Cash reserve floor as percent of total assets (Gate B).
    #[serde(default = "default_min_cash_reserve_pct")]
    pub min_cash_reserve_pct: Decimal,
    /// Maximum number of distinct held positions (Gate C).
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,
}

fn default_min_position_pct() -> Decimal {
    Decimal::from(8)
}

fn default_min_cash_reserve_pct() -> Decimal {
    Decimal::from(5)
}

fn default_max_positions() -> usize {
    10
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            min_position_pct: default_min_position_pct(),
            min_cash_reserve_pct: default_min_cash_reserve_pct(),
            max_positions: default_max_positions(),
        }
    }
}

/// Portfolio admission gate system.
///
/// All checks are pure over the snapshot and configuration; the struct
/// carries no mutable state and can be shared freely.
#[derive(Debug, Clone)]
pub struct RiskGate {
    limits: RiskLimits,
}

impl RiskGate {
    /// Create a gate system with the given limits.
    #[must_use]
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    /// Check all gates for a proposed trade.
    ///
    /// Evaluation order is A → B → C; the first block returns
    /// `RiskError::GateBlocked` carrying that gate's name and reason.
    ///
    /// `buy_amount` is the currency budget for a BUY. SELL and HOLD
    /// proposals carry no amount; gates A and B apply only to buys and
    /// are skipped when the amount is absent.
    pub fn check_all(
        &self,
        snapshot: &AccountSnapshot,
        symbol: &str,
        buy_amount: Option<Amount>,
    ) -> RiskResult<Vec<GateOutcome>> {
        let mut results = Vec::with_capacity(3);

        if let Some(amount) = buy_amount {
            // Gate A: minimum position size
            let gate_a = self.check_min_position(snapshot, amount);
            if let GateOutcome::Block(reason) = &gate_a {
                trace!(gate = "A", symbol, reason, "gate blocked");
                return Err(RiskError::GateBlocked {
                    gate: GateName::A,
                    reason: reason.clone(),
                });
            }
            results.push(gate_a);

            // Gate B: cash reserve
            let gate_b = self.check_cash_reserve(snapshot, amount);
            if let GateOutcome::Block(reason) = &gate_b {
                trace!(gate = "B", symbol, reason, "gate blocked");
                return Err(RiskError::GateBlocked {
                    gate: GateName::B,
                    reason: reason.clone(),
                });
            }
            results.push(gate_b);
        }

        // Gate C: position count
        let gate_c = self.check_position_count(snapshot, symbol);
        if let GateOutcome::Block(reason) = &gate_c {
            trace!(gate = "C", symbol, reason, "gate blocked");
            return Err(RiskError::GateBlocked {
                gate: GateName::C,
                reason: reason.clone(),
            });
        }
        results.push(gate_c);

        debug!(symbol, gates = results.len(), "all gates passed");
        Ok(results)
    }

    /// Gate A: minimum position size.
    ///
    /// Block if the buy budget is below `total_assets * min_position_pct / 100`.
    /// Equality passes.
    pub fn check_min_position(&self, snapshot: &AccountSnapshot, amount: Amount) -> GateOutcome {
        let threshold = snapshot.total_assets().pct(self.limits.min_position_pct);

        if amount < threshold {
            return GateOutcome::Block(format!(
                "suggested amount {} below minimum position size {} ({}% of total assets)",
                amount, threshold, self.limits.min_position_pct
            ));
        }

        GateOutcome::Pass
    }

    /// Gate B: cash reserve.
    ///
    /// Block if cash after the buy would fall below
    /// `total_assets * min_cash_reserve_pct / 100`. Equality passes.
    pub fn check_cash_reserve(&self, snapshot: &AccountSnapshot, amount: Amount) -> GateOutcome {
        let cash_after = snapshot.available_cash - amount;
        let min_cash = snapshot.total_assets().pct(self.limits.min_cash_reserve_pct);

        if cash_after < min_cash {
            return GateOutcome::Block(format!(
                "cash after buy {} below reserve floor {} ({}% of total assets)",
                cash_after, min_cash, self.limits.min_cash_reserve_pct
            ));
        }

        GateOutcome::Pass
    }

    /// Gate C: position count.
    ///
    /// Block only when `symbol` is not already held and the distinct
    /// position count is at the cap. Adding to an existing position
    /// always passes, even at the cap.
    pub fn check_position_count(&self, snapshot: &AccountSnapshot, symbol: &str) -> GateOutcome {
        if snapshot.holds(symbol) {
            return GateOutcome::Pass;
        }

        if snapshot.position_count() >= self.limits.max_positions {
            return GateOutcome::Block(format!(
                "already holding {} positions (cap {}), {} not among them",
                snapshot.position_count(),
                self.limits.max_positions,
                symbol
            ));
        }

        GateOutcome::Pass
    }

    /// Get current limits.
    #[must_use]
    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }
}
