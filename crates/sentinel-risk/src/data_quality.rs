//! Upstream data feed health gate.
//!
//! Tracks a rolling failure count per symbol feed. Two consecutive
//! failures mark the feed untrustworthy and block new trades on that
//! symbol until a successful update resets the counter.

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::error::{RiskError, RiskResult};
use crate::gates::{GateName, GateOutcome};

/// Failure count at which the gate blocks.
const DEFAULT_MAX_FAILURES: u32 = 2;

/// Per-symbol feed failure gate.
///
/// Counters are concurrent: feed monitors record from their own tasks
/// while the executor checks during admission.
#[derive(Debug)]
pub struct DataQualityGate {
    failures: DashMap<String, u32>,
    max_failures: u32,
}

impl DataQualityGate {
    /// Create a gate blocking at the default failure count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_failures(DEFAULT_MAX_FAILURES)
    }

    /// Create a gate blocking at `max_failures`.
    #[must_use]
    pub fn with_max_failures(max_failures: u32) -> Self {
        Self {
            failures: DashMap::new(),
            max_failures,
        }
    }

    /// Record a feed failure for `symbol`, returning the new count.
    pub fn record_failure(&self, symbol: &str) -> u32 {
        let mut entry = self.failures.entry(symbol.to_string()).or_insert(0);
        *entry += 1;
        let count = *entry;
        drop(entry);

        if count >= self.max_failures {
            warn!(symbol, failures = count, "data feed marked unhealthy");
        }
        count
    }

    /// Record a successful feed update, resetting the counter.
    pub fn record_success(&self, symbol: &str) {
        if self.failures.remove(symbol).is_some() {
            debug!(symbol, "data feed recovered");
        }
    }

    /// Current failure count for `symbol`.
    #[must_use]
    pub fn failure_count(&self, symbol: &str) -> u32 {
        self.failures.get(symbol).map(|c| *c).unwrap_or(0)
    }

    /// Check feed health for `symbol`.
    ///
    /// Blocks at `max_failures` or above; one failure is tolerated.
    pub fn check(&self, symbol: &str) -> GateOutcome {
        let count = self.failure_count(symbol);
        if count >= self.max_failures {
            return GateOutcome::Block(format!(
                "data feed for {symbol} failed {count} consecutive updates"
            ));
        }
        GateOutcome::Pass
    }

    /// Check feed health, mapping a block to `RiskError::GateBlocked`.
    pub fn check_or_err(&self, symbol: &str) -> RiskResult<()> {
        match self.check(symbol) {
            GateOutcome::Pass => Ok(()),
            GateOutcome::Block(reason) => Err(RiskError::GateBlocked {
                gate: GateName::DataQuality,
                reason,
            }),
        }
    }
}

impl Default for DataQualityGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_failure_passes() {
        let gate = DataQualityGate::new();
        gate.record_failure("005930");
        assert!(gate.check("005930").is_pass());
    }

    #[test]
    fn test_two_failures_block() {
        let gate = DataQualityGate::new();
        gate.record_failure("005930");
        gate.record_failure("005930");
        assert!(gate.check("005930").is_block());
    }

    #[test]
    fn test_success_resets_counter() {
        let gate = DataQualityGate::new();
        gate.record_failure("005930");
        gate.record_failure("005930");
        assert!(gate.check("005930").is_block());

        gate.record_success("005930");
        assert!(gate.check("005930").is_pass());
        assert_eq!(gate.failure_count("005930"), 0);
    }

    #[test]
    fn test_counters_are_per_symbol() {
        let gate = DataQualityGate::new();
        gate.record_failure("005930");
        gate.record_failure("005930");

        assert!(gate.check("005930").is_block());
        assert!(gate.check("000660").is_pass());
    }

    #[test]
    fn test_check_or_err_names_gate() {
        let gate = DataQualityGate::new();
        gate.record_failure("005930");
        gate.record_failure("005930");

        match gate.check_or_err("005930") {
            Err(RiskError::GateBlocked { gate: name, .. }) => {
                assert_eq!(name, GateName::DataQuality);
            }
            other => panic!("expected GateBlocked, got {other:?}"),
        }
    }
}
