//! Stop-loss and take-profit band clamps.
//!
//! Upstream agents may propose exit prices anywhere; before a signal is
//! admitted they are bounded into a configured percentage band around
//! the current price. Absent proposals get the configured default offset.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sentinel_core::Price;

/// Percentage bands for exit prices.
///
/// Stop-loss prices live below the current price, take-profit targets
/// above it. `min_*`/`max_*` bound the distance from current price,
/// `stop_loss_pct`/`take_profit_pct` are the defaults used when no
/// price was proposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceBands {
    /// Default stop-loss distance below current price, percent.
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Tightest allowed stop-loss distance, percent.
    #[serde(default = "default_min_stop_loss_pct")]
    pub min_stop_loss_pct: Decimal,
    /// Widest allowed stop-loss distance, percent.
    #[serde(default = "default_max_stop_loss_pct")]
    pub max_stop_loss_pct: Decimal,
    /// Default take-profit distance above current price, percent.
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    /// Smallest allowed take-profit distance, percent.
    #[serde(default = "default_min_take_profit_pct")]
    pub min_take_profit_pct: Decimal,
    /// Largest allowed take-profit distance, percent.
    #[serde(default = "default_max_take_profit_pct")]
    pub max_take_profit_pct: Decimal,
}

fn default_stop_loss_pct() -> Decimal {
    Decimal::from(5)
}

fn default_min_stop_loss_pct() -> Decimal {
    Decimal::from(3)
}

fn default_max_stop_loss_pct() -> Decimal {
    Decimal::from(15)
}

fn default_take_profit_pct() -> Decimal {
    Decimal::from(20)
}

fn default_min_take_profit_pct() -> Decimal {
    Decimal::from(5)
}

fn default_max_take_profit_pct() -> Decimal {
    Decimal::from(50)
}

impl Default for PriceBands {
    fn default() -> Self {
        Self {
            stop_loss_pct: default_stop_loss_pct(),
            min_stop_loss_pct: default_min_stop_loss_pct(),
            max_stop_loss_pct: default_max_stop_loss_pct(),
            take_profit_pct: default_take_profit_pct(),
            min_take_profit_pct: default_min_take_profit_pct(),
            max_take_profit_pct: default_max_take_profit_pct(),
        }
    }
}

impl PriceBands {
    /// Bound a proposed stop-loss into the configured band.
    ///
    /// Absent proposal: current price minus the default offset. Inside
    /// the band the proposal is returned unchanged; outside it snaps to
    /// the nearer bound.
    #[must_use]
    pub fn clamp_stop_loss(&self, proposed: Option<Price>, current: Price) -> Price {
        let proposed = match proposed {
            Some(p) => p,
            None => return current.at_pct_offset(-self.stop_loss_pct),
        };

        let lower = current.at_pct_offset(-self.max_stop_loss_pct);
        let upper = current.at_pct_offset(-self.min_stop_loss_pct);
        clamp(proposed, lower, upper)
    }

    /// Bound a proposed take-profit target into the configured band.
    #[must_use]
    pub fn clamp_target_price(&self, proposed: Option<Price>, current: Price) -> Price {
        let proposed = match proposed {
            Some(p) => p,
            None => return current.at_pct_offset(self.take_profit_pct),
        };

        let lower = current.at_pct_offset(self.min_take_profit_pct);
        let upper = current.at_pct_offset(self.max_take_profit_pct);
        clamp(proposed, lower, upper)
    }
}

fn clamp(value: Price, lower: Price, upper: Price) -> Price {
    if value < lower {
        lower
    } else if value > upper {
        upper
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bands() -> PriceBands {
        PriceBands::default()
    }

    #[test]
    fn test_stop_loss_default_when_absent() {
        let result = bands().clamp_stop_loss(None, Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(95000)));
    }

    #[test]
    fn test_stop_loss_inside_band_unchanged() {
        // Band at 100,000: [85,000, 97,000]
        let result = bands().clamp_stop_loss(Some(Price::new(dec!(90000))), Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(90000)));
    }

    #[test]
    fn test_stop_loss_too_tight_snaps_to_upper() {
        let result = bands().clamp_stop_loss(Some(Price::new(dec!(99000))), Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(97000)));
    }

    #[test]
    fn test_stop_loss_too_wide_snaps_to_lower() {
        let result = bands().clamp_stop_loss(Some(Price::new(dec!(70000))), Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(85000)));
    }

    #[test]
    fn test_target_default_when_absent() {
        let result = bands().clamp_target_price(None, Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(120000)));
    }

    #[test]
    fn test_target_inside_band_unchanged() {
        // Band at 100,000: [105,000, 150,000]
        let result =
            bands().clamp_target_price(Some(Price::new(dec!(120000))), Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(120000)));
    }

    #[test]
    fn test_target_too_low_snaps_to_lower() {
        let result =
            bands().clamp_target_price(Some(Price::new(dec!(101000))), Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(105000)));
    }

    #[test]
    fn test_target_too_high_snaps_to_upper() {
        let result =
            bands().clamp_target_price(Some(Price::new(dec!(200000))), Price::new(dec!(100000)));
        assert_eq!(result, Price::new(dec!(150000)));
    }
}
