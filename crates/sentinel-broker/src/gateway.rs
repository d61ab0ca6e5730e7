//! Brokerage gateway trait and wire types.
//!
//! Trait-based abstraction over the brokerage account and order API.
//! This allows for:
//! - Dependency injection for testing
//! - Separation of decision logic from transport

use serde::{Deserialize, Serialize};

use sentinel_core::{AccountSnapshot, Amount, BoxFuture, OrderSide, Price};

use crate::error::BrokerResult;

/// Account balance figures from the brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Cash available for new orders.
    pub available_amount: Amount,
    /// Evaluation value of held positions.
    pub total_evaluation: Amount,
}

/// One held position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: u32,
}

/// Order pricing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute at the current market price; `price` is ignored.
    Market,
    /// Execute at `price` or better.
    Limit,
}

/// An order submitted to the brokerage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u32,
    /// Limit price; `Price::ZERO` for market orders.
    pub price: Price,
    pub order_type: OrderType,
}

/// Placement outcome reported by the brokerage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Submitted,
    Failed,
}

/// Brokerage response to an order placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub status: OrderStatus,
    /// Brokerage order number, present on submission.
    pub order_no: Option<String>,
    pub message: String,
}

impl OrderReceipt {
    #[must_use]
    pub fn is_submitted(&self) -> bool {
        self.status == OrderStatus::Submitted
    }
}

/// Trait for the brokerage account and order API.
///
/// All methods are I/O and must be awaited; implementations own their
/// connection state. Object-safe so the executor can hold `Arc<dyn
/// BrokerageGateway>`.
pub trait BrokerageGateway: Send + Sync {
    /// Fetch current cash and evaluation figures.
    fn fetch_balance(&self) -> BoxFuture<'_, BrokerResult<AccountBalance>>;

    /// Fetch currently held positions.
    fn fetch_holdings(&self) -> BoxFuture<'_, BrokerResult<Vec<Holding>>>;

    /// Place an order, returning the brokerage receipt.
    ///
    /// A `Failed` receipt is a normal response, not an `Err`; `Err` is
    /// reserved for transport or protocol failures.
    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, BrokerResult<OrderReceipt>>;
}

/// Read a fresh account snapshot from the gateway.
///
/// Composes balance and holdings into the shape the risk gates consume.
/// Called once per gate evaluation; results are never cached.
pub async fn read_account_snapshot(
    gateway: &dyn BrokerageGateway,
) -> BrokerResult<AccountSnapshot> {
    let balance = gateway.fetch_balance().await?;
    let holdings = gateway.fetch_holdings().await?;

    let symbols = holdings
        .into_iter()
        .filter(|h| h.quantity > 0)
        .map(|h| h.symbol)
        .collect();

    Ok(AccountSnapshot::new(
        balance.available_amount,
        balance.total_evaluation,
        symbols,
    ))
}
