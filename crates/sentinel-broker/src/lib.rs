//! Brokerage gateway and trading calendar.
//!
//! Defines the external interfaces the execution pipeline consumes:
//! - `BrokerageGateway`: balance, holdings, and order placement
//! - `TradingCalendar`: whether orders can be placed right now
//!
//! `RestGateway` talks to the brokerage open API over HTTPS;
//! `MockGateway` records calls and returns scripted responses for tests
//! of dependent crates.

pub mod error;
pub mod gateway;
pub mod hours;
pub mod mock;
pub mod rest;

pub use error::{BrokerError, BrokerResult};
pub use gateway::{
    read_account_snapshot, AccountBalance, BrokerageGateway, Holding, OrderReceipt, OrderRequest,
    OrderStatus, OrderType,
};
pub use hours::{ExchangeCalendar, FixedCalendar, HoursDecision, TradingCalendar};
pub use mock::MockGateway;
pub use rest::RestGateway;
