//! Action classification and price band clamps.
//!
//! Turns multi-agent scores and a funding percentage into a BUY/SELL/HOLD
//! decision, and bounds proposed stop-loss/target prices into configured
//! bands around the current price.

pub mod bands;
pub mod classifier;

pub use bands::PriceBands;
pub use classifier::{classify_action, AgentScores, ClassifierConfig};
