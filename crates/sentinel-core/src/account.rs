//! Point-in-time brokerage account state.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::Amount;

/// A point-in-time read of cash and holdings from the brokerage.
///
/// Consumed, never owned, by the risk gates. A snapshot must be read
/// fresh from the gateway for every gate evaluation; caching one across
/// evaluations risks acting on stale balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Cash available for new orders.
    pub available_cash: Amount,
    /// Evaluation value of held positions.
    pub held_value: Amount,
    /// Symbols currently held (quantity > 0).
    pub holdings: HashSet<String>,
}

impl AccountSnapshot {
    /// Create a snapshot from balance figures and held symbols.
    #[must_use]
    pub fn new(available_cash: Amount, held_value: Amount, holdings: HashSet<String>) -> Self {
        Self {
            available_cash,
            held_value,
            holdings,
        }
    }

    /// Total assets: cash plus held value.
    #[must_use]
    pub fn total_assets(&self) -> Amount {
        self.available_cash + self.held_value
    }

    /// Whether the account already holds `symbol`.
    #[must_use]
    pub fn holds(&self, symbol: &str) -> bool {
        self.holdings.contains(symbol)
    }

    /// Number of distinct held positions.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.holdings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_assets() {
        let snapshot = AccountSnapshot::new(
            Amount::new(dec!(2000000)),
            Amount::new(dec!(8000000)),
            HashSet::new(),
        );
        assert_eq!(snapshot.total_assets(), Amount::new(dec!(10000000)));
    }

    #[test]
    fn test_holdings_lookup() {
        let mut holdings = HashSet::new();
        holdings.insert("005930".to_string());

        let snapshot =
            AccountSnapshot::new(Amount::new(dec!(1000000)), Amount::new(dec!(500000)), holdings);

        assert!(snapshot.holds("005930"));
        assert!(!snapshot.holds("000660"));
        assert_eq!(snapshot.position_count(), 1);
    }
}
