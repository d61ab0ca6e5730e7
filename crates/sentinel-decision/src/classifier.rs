//! BUY/SELL/HOLD classification from agent scores.

use serde::{Deserialize, Serialize};
use tracing::debug;

use sentinel_core::TradeAction;

/// Trigger source that activates the news acceptance floor.
const NEWS_TRIGGER: &str = "news";

/// Scores produced by the three analysis agents, each on a 1–10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentScores {
    pub quant: f64,
    pub fundamental: f64,
    pub news: f64,
}

impl AgentScores {
    #[must_use]
    pub fn new(quant: f64, fundamental: f64, news: f64) -> Self {
        Self {
            quant,
            fundamental,
            news,
        }
    }

    /// Mean of the three agent scores.
    #[must_use]
    pub fn mean(&self) -> f64 {
        (self.quant + self.fundamental + self.news) / 3.0
    }
}

/// Classification thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// News score below this floor forces SELL for news-triggered
    /// proposals, regardless of the other inputs. Applied only when the
    /// trigger source is "news": the floor models distrust of a
    /// news-driven proposal whose own news evidence is weak. For other
    /// trigger sources the news score still participates in the mean.
    #[serde(default = "default_news_floor")]
    pub news_floor: f64,
    /// Minimum funding percentage for a BUY.
    #[serde(default = "default_buy_min_percent")]
    pub buy_min_percent: f64,
    /// Minimum mean agent score for a BUY.
    #[serde(default = "default_buy_min_mean_score")]
    pub buy_min_mean_score: f64,
}

fn default_news_floor() -> f64 {
    4.0
}

fn default_buy_min_percent() -> f64 {
    10.0
}

fn default_buy_min_mean_score() -> f64 {
    6.0
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            news_floor: default_news_floor(),
            buy_min_percent: default_buy_min_percent(),
            buy_min_mean_score: default_buy_min_mean_score(),
        }
    }
}

/// Classify a proposal into BUY, SELL or HOLD.
///
/// `final_percent` is the signed funding allocation from the upstream
/// pipeline. Decision order:
/// 1. Negative allocation sells.
/// 2. A news-triggered proposal with a news score under the floor sells.
/// 3. Allocation at or above the buy threshold with a strong enough mean
///    score buys.
/// 4. Everything else holds.
#[must_use]
pub fn classify_action(
    config: &ClassifierConfig,
    final_percent: f64,
    scores: AgentScores,
    trigger_source: &str,
) -> TradeAction {
    if final_percent < 0.0 {
        return TradeAction::Sell;
    }

    if trigger_source == NEWS_TRIGGER && scores.news < config.news_floor {
        debug!(
            news_score = scores.news,
            floor = config.news_floor,
            "news score under acceptance floor, forcing SELL"
        );
        return TradeAction::Sell;
    }

    if final_percent >= config.buy_min_percent && scores.mean() >= config.buy_min_mean_score {
        return TradeAction::Buy;
    }

    TradeAction::Hold
}
