//! Mock brokerage gateway for testing dependents.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use sentinel_core::{Amount, BoxFuture};

use crate::error::{BrokerError, BrokerResult};
use crate::gateway::{
    AccountBalance, BrokerageGateway, Holding, OrderReceipt, OrderRequest, OrderStatus,
};

/// Mock gateway with scripted balances, holdings and receipts.
///
/// Records every placed order for verification. When no receipt is
/// scripted, placements succeed with a sequential order number.
#[derive(Debug)]
pub struct MockGateway {
    balance: Mutex<AccountBalance>,
    holdings: Mutex<Vec<Holding>>,
    /// Scripted receipts, popped front-first; empty = auto-submit.
    receipts: Mutex<VecDeque<OrderReceipt>>,
    /// Recorded placements for verification.
    placed: Mutex<Vec<OrderRequest>>,
    /// Counters for snapshot-read verification.
    balance_reads: AtomicU64,
    /// When set, balance and holdings fetches fail.
    snapshot_unavailable: AtomicBool,
    next_order_no: AtomicU64,
}

impl MockGateway {
    /// Create a mock with an empty account.
    pub fn new() -> Self {
        Self {
            balance: Mutex::new(AccountBalance {
                available_amount: Amount::ZERO,
                total_evaluation: Amount::ZERO,
            }),
            holdings: Mutex::new(Vec::new()),
            receipts: Mutex::new(VecDeque::new()),
            placed: Mutex::new(Vec::new()),
            balance_reads: AtomicU64::new(0),
            snapshot_unavailable: AtomicBool::new(false),
            next_order_no: AtomicU64::new(1),
        }
    }

    /// Script the balance returned by `fetch_balance`.
    pub fn set_balance(&self, balance: AccountBalance) {
        *self.balance.lock() = balance;
    }

    /// Script the holdings returned by `fetch_holdings`.
    pub fn set_holdings(&self, holdings: Vec<Holding>) {
        *self.holdings.lock() = holdings;
    }

    /// Queue a receipt for the next placement.
    pub fn push_receipt(&self, receipt: OrderReceipt) {
        self.receipts.lock().push_back(receipt);
    }

    /// Make balance/holdings fetches fail until cleared.
    pub fn set_snapshot_unavailable(&self, unavailable: bool) {
        self.snapshot_unavailable
            .store(unavailable, Ordering::Release);
    }

    /// Orders placed so far.
    pub fn placed_orders(&self) -> Vec<OrderRequest> {
        self.placed.lock().clone()
    }

    /// Number of balance fetches observed.
    pub fn balance_reads(&self) -> u64 {
        self.balance_reads.load(Ordering::Acquire)
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerageGateway for MockGateway {
    fn fetch_balance(&self) -> BoxFuture<'_, BrokerResult<AccountBalance>> {
        Box::pin(async move {
            self.balance_reads.fetch_add(1, Ordering::AcqRel);
            if self.snapshot_unavailable.load(Ordering::Acquire) {
                return Err(BrokerError::HttpClient("balance unavailable".to_string()));
            }
            Ok(self.balance.lock().clone())
        })
    }

    fn fetch_holdings(&self) -> BoxFuture<'_, BrokerResult<Vec<Holding>>> {
        Box::pin(async move {
            if self.snapshot_unavailable.load(Ordering::Acquire) {
                return Err(BrokerError::HttpClient("holdings unavailable".to_string()));
            }
            Ok(self.holdings.lock().clone())
        })
    }

    fn place_order(&self, request: OrderRequest) -> BoxFuture<'_, BrokerResult<OrderReceipt>> {
        Box::pin(async move {
            self.placed.lock().push(request);

            if let Some(receipt) = self.receipts.lock().pop_front() {
                return Ok(receipt);
            }

            let order_no = self.next_order_no.fetch_add(1, Ordering::AcqRel);
            Ok(OrderReceipt {
                status: OrderStatus::Submitted,
                order_no: Some(format!("ORD{order_no:08}")),
                message: "submitted".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{OrderSide, Price};

    #[tokio::test]
    async fn test_auto_submit_and_recording() {
        let gateway = MockGateway::new();
        let request = OrderRequest {
            symbol: "005930".to_string(),
            side: OrderSide::Buy,
            quantity: 10,
            price: Price::ZERO,
            order_type: crate::gateway::OrderType::Market,
        };

        let receipt = gateway.place_order(request.clone()).await.unwrap();
        assert!(receipt.is_submitted());
        assert_eq!(gateway.placed_orders(), vec![request]);
    }

    #[tokio::test]
    async fn test_scripted_failure_receipt() {
        let gateway = MockGateway::new();
        gateway.push_receipt(OrderReceipt {
            status: OrderStatus::Failed,
            order_no: None,
            message: "rejected by exchange".to_string(),
        });

        let receipt = gateway
            .place_order(OrderRequest {
                symbol: "005930".to_string(),
                side: OrderSide::Sell,
                quantity: 5,
                price: Price::ZERO,
                order_type: crate::gateway::OrderType::Market,
            })
            .await
            .unwrap();

        assert!(!receipt.is_submitted());
        assert_eq!(receipt.order_no, None);
    }
}
