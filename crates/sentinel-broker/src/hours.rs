//! Trading-hours calendar.
//!
//! Decides whether an order can be placed right now. The pipeline never
//! guesses: a signal approved outside the session window is queued and
//! replayed when the calendar next allows it.

use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Answer from the trading-hours oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoursDecision {
    pub allowed: bool,
    pub reason: String,
}

impl HoursDecision {
    fn open() -> Self {
        Self {
            allowed: true,
            reason: "regular session".to_string(),
        }
    }

    fn closed(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
        }
    }
}

/// Trait for the trading-hours oracle.
///
/// Pure over the supplied instant so queue-replay tests can pin time.
pub trait TradingCalendar: Send + Sync {
    /// Whether orders can be placed at `now`.
    fn can_execute_order(&self, now: DateTime<Utc>) -> HoursDecision;
}

/// Exchange session calendar at a fixed UTC offset.
///
/// Weekday regular session only; weekends are closed. Exchange holidays
/// surface as placement failures and are handled by the retry queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeCalendar {
    /// Exchange-local offset from UTC, in hours (e.g. 9 for KST).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// Session open, exchange-local time.
    #[serde(default = "default_session_open")]
    pub session_open: NaiveTime,
    /// Session close, exchange-local time (exclusive).
    #[serde(default = "default_session_close")]
    pub session_close: NaiveTime,
}

fn default_utc_offset_hours() -> i32 {
    9
}

fn default_session_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap()
}

fn default_session_close() -> NaiveTime {
    NaiveTime::from_hms_opt(15, 30, 0).unwrap()
}

impl Default for ExchangeCalendar {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            session_open: default_session_open(),
            session_close: default_session_close(),
        }
    }
}

impl TradingCalendar for ExchangeCalendar {
    fn can_execute_order(&self, now: DateTime<Utc>) -> HoursDecision {
        let offset = match FixedOffset::east_opt(self.utc_offset_hours * 3600) {
            Some(o) => o,
            // Misconfigured offset fails closed.
            None => return HoursDecision::closed("invalid exchange UTC offset"),
        };
        let local = now.with_timezone(&offset);

        match local.weekday() {
            Weekday::Sat | Weekday::Sun => {
                return HoursDecision::closed(format!("weekend ({})", local.weekday()));
            }
            _ => {}
        }

        let time = local.time();
        if time < self.session_open || time >= self.session_close {
            return HoursDecision::closed(format!(
                "outside session hours ({}-{} local, now {})",
                self.session_open.format("%H:%M"),
                self.session_close.format("%H:%M"),
                time.format("%H:%M")
            ));
        }

        HoursDecision::open()
    }
}

/// Calendar pinned open or closed, for tests and manual override.
#[derive(Debug, Clone, Copy)]
pub struct FixedCalendar {
    allowed: bool,
}

impl FixedCalendar {
    #[must_use]
    pub fn open() -> Self {
        Self { allowed: true }
    }

    #[must_use]
    pub fn closed() -> Self {
        Self { allowed: false }
    }
}

impl TradingCalendar for FixedCalendar {
    fn can_execute_order(&self, _now: DateTime<Utc>) -> HoursDecision {
        if self.allowed {
            HoursDecision::open()
        } else {
            HoursDecision::closed("market closed (fixed calendar)")
        }
    }
}
