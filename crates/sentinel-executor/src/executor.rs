//! Core signal executor.
//!
//! Drives signals through their lifecycle with a single-writer
//! discipline: one `tokio::sync::Mutex` guards `pending_signals` and
//! `queued_executions` and is held for the whole of each public
//! operation, so concurrent approve/replay calls serialize and a signal
//! id is acted on at most once per batch.
//!
//! # Admission Check Order (Strict)
//!
//! 1. Classification          → HOLD proposals carry no order intent
//! 2. Zero-quantity guard     → BUY with no shares becomes HOLD
//! 3. Price band clamps
//! 4. DataQuality gate        → Rejected(data_quality)
//! 5. Account snapshot read   → Rejected on failure (fail closed)
//! 6. Gate A / B / C          → Rejected(first blocking gate)
//! 7. (all passed)            → Pending, persisted, audited

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sentinel_audit::AuditRecorder;
use sentinel_broker::{
    read_account_snapshot, BrokerageGateway, OrderReceipt, OrderRequest, OrderType,
    TradingCalendar,
};
use sentinel_core::{
    Amount, AuditEventType, Price, Signal, SignalEvent, SignalId, SignalStatus, TradeAction,
};
use sentinel_decision::{classify_action, AgentScores, ClassifierConfig, PriceBands};
use sentinel_persistence::{SignalStore, StatusUpdate};
use sentinel_risk::{DataQualityGate, RiskError, RiskGate};

use crate::error::{ExecutorError, ExecutorResult};

// ============================================================================
// TradeProposal
// ============================================================================

/// Raw proposal from the upstream analysis agents, before admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeProposal {
    pub symbol: String,
    pub company_name: String,
    /// Current market price, used for band clamps.
    pub current_price: Price,
    /// Signed funding allocation percentage.
    pub final_percent: f64,
    pub scores: AgentScores,
    /// Aggregate confidence (0.0–1.0).
    pub confidence: f64,
    pub trigger_source: String,
    pub suggested_quantity: u32,
    pub suggested_amount: Amount,
    pub proposed_stop_loss: Option<Price>,
    pub proposed_target: Option<Price>,
}

// ============================================================================
// ExecutorConfig
// ============================================================================

/// Configuration for the executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Age at which a still-pending signal expires, hours.
    #[serde(default = "default_pending_max_age_hours")]
    pub pending_max_age_hours: i64,
    /// Extra cash required over the suggested amount at queue replay,
    /// percent. Zero requires cash to merely cover the amount.
    #[serde(default = "default_cash_margin_pct")]
    pub cash_margin_pct: Decimal,
}

fn default_pending_max_age_hours() -> i64 {
    24
}

fn default_cash_margin_pct() -> Decimal {
    Decimal::ZERO
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            pending_max_age_hours: default_pending_max_age_hours(),
            cash_margin_pct: default_cash_margin_pct(),
        }
    }
}

// ============================================================================
// BatchSummary
// ============================================================================

/// Outcome counts of one `process_queued_executions` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Orders placed and accepted.
    pub executed: usize,
    /// Signals cancelled (insufficient funds, zero quantity).
    pub cancelled: usize,
    /// Placement failed; signal re-enqueued for the next pass.
    pub requeued: usize,
    /// Market still closed; signal left queued untouched.
    pub deferred: usize,
}

// ============================================================================
// SignalExecutor
// ============================================================================

/// In-memory signal collections, guarded by the executor's mutex.
#[derive(Debug, Default)]
struct ExecutorState {
    /// Signals awaiting an approve/reject decision.
    pending: Vec<Signal>,
    /// Approved signals deferred until the market allows placement.
    queued: VecDeque<Signal>,
}

/// The state-machine driver for trading signals.
///
/// Constructed once at startup with injected dependencies; there are no
/// ambient globals. All brokerage and persistence calls are awaited and
/// are the only suspension points.
pub struct SignalExecutor {
    state: Mutex<ExecutorState>,
    gateway: Arc<dyn BrokerageGateway>,
    calendar: Arc<dyn TradingCalendar>,
    store: Arc<dyn SignalStore>,
    audit: AuditRecorder,
    risk_gate: RiskGate,
    data_quality: Arc<DataQualityGate>,
    classifier: ClassifierConfig,
    bands: PriceBands,
    config: ExecutorConfig,
}

impl SignalExecutor {
    /// Create an executor over its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<dyn BrokerageGateway>,
        calendar: Arc<dyn TradingCalendar>,
        store: Arc<dyn SignalStore>,
        audit: AuditRecorder,
        risk_gate: RiskGate,
        data_quality: Arc<DataQualityGate>,
        classifier: ClassifierConfig,
        bands: PriceBands,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            state: Mutex::new(ExecutorState::default()),
            gateway,
            calendar,
            store,
            audit,
            risk_gate,
            data_quality,
            classifier,
            bands,
            config,
        }
    }

    /// Number of signals awaiting a decision.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Number of signals in the deferred-execution queue.
    pub async fn queued_count(&self) -> usize {
        self.state.lock().await.queued.len()
    }

    // ------------------------------------------------------------------
    // Admission
    // ------------------------------------------------------------------

    /// Run a proposal through classification, clamps and gates.
    ///
    /// Returns the created signal: `Pending` when admitted, `Rejected`
    /// with the blocking gate audited when not. Errors reading the
    /// account snapshot fail closed into a rejection, never into a
    /// speculative trade.
    pub async fn admit_signal(&self, proposal: TradeProposal) -> ExecutorResult<Signal> {
        let mut action = classify_action(
            &self.classifier,
            proposal.final_percent,
            proposal.scores,
            &proposal.trigger_source,
        );

        // A BUY with no shares must never reach the executor as a BUY.
        if action == TradeAction::Buy && proposal.suggested_quantity == 0 {
            debug!(symbol = %proposal.symbol, "zero-quantity BUY downgraded to HOLD");
            action = TradeAction::Hold;
        }

        let stop_loss = self
            .bands
            .clamp_stop_loss(proposal.proposed_stop_loss, proposal.current_price);
        let target_price = self
            .bands
            .clamp_target_price(proposal.proposed_target, proposal.current_price);

        let mut signal = Signal {
            id: SignalId::new(),
            symbol: proposal.symbol.clone(),
            company_name: proposal.company_name.clone(),
            action,
            suggested_quantity: proposal.suggested_quantity,
            suggested_amount: proposal.suggested_amount,
            target_price,
            stop_loss,
            confidence: proposal.confidence,
            quant_score: proposal.scores.quant,
            fundamental_score: proposal.scores.fundamental,
            trigger_source: proposal.trigger_source.clone(),
            status: SignalStatus::Pending,
            created_at: Utc::now(),
            executed_at: None,
            order_no: None,
        };

        if let Some(block) = self.admission_block(&signal).await {
            signal.transition_to(SignalStatus::Rejected)?;
            self.store
                .insert_signal(
                    signal.clone(),
                    proposal.final_percent,
                    Some(format!("gate {}: {}", block.0, block.1)),
                )
                .await?;
            self.audit
                .record_now(SignalEvent::new(
                    Some(signal.id.clone()),
                    AuditEventType::GateBlocked,
                    &signal.symbol,
                    Some(signal.action),
                    json!({"gate": block.0, "reason": block.1}),
                ))
                .await;
            return Ok(signal);
        }

        self.store
            .insert_signal(signal.clone(), proposal.final_percent, None)
            .await?;
        self.audit
            .record_now(SignalEvent::new(
                Some(signal.id.clone()),
                AuditEventType::SignalAdmitted,
                &signal.symbol,
                Some(signal.action),
                json!({
                    "confidence": signal.confidence,
                    "suggested_amount": signal.suggested_amount,
                    "trigger_source": signal.trigger_source,
                }),
            ))
            .await;

        self.state.lock().await.pending.push(signal.clone());
        info!(id = signal.id.as_str(), symbol = %signal.symbol, action = %signal.action, "signal admitted");
        Ok(signal)
    }

    /// Gate check for admission. `None` means pass; `Some((gate, reason))`
    /// names the first block.
    async fn admission_block(&self, signal: &Signal) -> Option<(String, String)> {
        // HOLD carries no order intent; nothing to gate.
        if signal.action == TradeAction::Hold {
            return None;
        }

        if let Err(RiskError::GateBlocked { gate, reason }) =
            self.data_quality.check_or_err(&signal.symbol)
        {
            return Some((gate.to_string(), reason));
        }

        // Gates A/B/C concern buying power; sells stop at data quality.
        if signal.action != TradeAction::Buy {
            return None;
        }

        let snapshot = match read_account_snapshot(self.gateway.as_ref()).await {
            Ok(s) => s,
            Err(e) => {
                // Uncertain inputs block the trade.
                warn!(symbol = %signal.symbol, error = %e, "snapshot read failed; failing closed");
                return Some((
                    "snapshot".to_string(),
                    format!("account snapshot unavailable: {e}"),
                ));
            }
        };

        match self
            .risk_gate
            .check_all(&snapshot, &signal.symbol, Some(signal.suggested_amount))
        {
            Ok(_) => None,
            Err(RiskError::GateBlocked { gate, reason }) => Some((gate.to_string(), reason)),
            Err(RiskError::SnapshotUnavailable(reason)) => Some(("snapshot".to_string(), reason)),
        }
    }

    // ------------------------------------------------------------------
    // Approval / rejection
    // ------------------------------------------------------------------

    /// Approve a pending signal and, when possible, place its order.
    ///
    /// HOLD signals are approved without any brokerage call. When the
    /// market is closed, or placement fails, the signal lands in the
    /// deferred queue instead of failing the caller.
    pub async fn approve_signal(&self, id: &SignalId) -> ExecutorResult<Signal> {
        let mut state = self.state.lock().await;

        let index = state
            .pending
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| ExecutorError::SignalNotFound(id.clone()))?;
        let mut signal = state.pending.remove(index);

        signal.transition_to(SignalStatus::Approved)?;
        self.store
            .update_signal_status(signal.id.clone(), signal.status, StatusUpdate::default())
            .await?;
        self.audit
            .record_now(SignalEvent::new(
                Some(signal.id.clone()),
                AuditEventType::SignalApproved,
                &signal.symbol,
                Some(signal.action),
                json!({}),
            ))
            .await;

        // HOLD ends here: approved, no order, under any market condition.
        if signal.action == TradeAction::Hold || signal.suggested_quantity == 0 {
            return Ok(signal);
        }

        let hours = self.calendar.can_execute_order(Utc::now());
        if !hours.allowed {
            return self.queue_signal(&mut state, signal, &hours.reason).await;
        }

        match self.place_order_for(&signal).await {
            Ok(receipt) if receipt.is_submitted() => {
                signal.transition_to(SignalStatus::Executed)?;
                signal.mark_placed(receipt.order_no.clone(), Utc::now());
                self.store
                    .update_signal_status(
                        signal.id.clone(),
                        signal.status,
                        StatusUpdate {
                            executed_at: signal.executed_at,
                            order_no: signal.order_no.clone(),
                            ..Default::default()
                        },
                    )
                    .await?;
                self.audit
                    .record_now(SignalEvent::new(
                        Some(signal.id.clone()),
                        AuditEventType::OrderExecuted,
                        &signal.symbol,
                        Some(signal.action),
                        json!({"order_no": signal.order_no}),
                    ))
                    .await;
                info!(id = signal.id.as_str(), symbol = %signal.symbol, "order executed");
                Ok(signal)
            }
            Ok(receipt) => {
                self.audit
                    .record_now(SignalEvent::new(
                        Some(signal.id.clone()),
                        AuditEventType::OrderPlacementFailed,
                        &signal.symbol,
                        Some(signal.action),
                        json!({"message": receipt.message, "requeued": true}),
                    ))
                    .await;
                self.queue_signal(&mut state, signal, "order placement failed")
                    .await
            }
            Err(e) => {
                self.audit
                    .record_now(SignalEvent::new(
                        Some(signal.id.clone()),
                        AuditEventType::OrderPlacementFailed,
                        &signal.symbol,
                        Some(signal.action),
                        json!({"message": e.to_string(), "requeued": true}),
                    ))
                    .await;
                self.queue_signal(&mut state, signal, "brokerage unavailable")
                    .await
            }
        }
    }

    /// Reject a pending signal. Never touches the brokerage.
    pub async fn reject_signal(&self, id: &SignalId) -> ExecutorResult<Signal> {
        let mut state = self.state.lock().await;

        let index = state
            .pending
            .iter()
            .position(|s| &s.id == id)
            .ok_or_else(|| ExecutorError::SignalNotFound(id.clone()))?;
        let mut signal = state.pending.remove(index);

        signal.transition_to(SignalStatus::Rejected)?;
        self.store
            .update_signal_status(
                signal.id.clone(),
                signal.status,
                StatusUpdate {
                    reason: Some("rejected by operator".to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.audit
            .record_now(SignalEvent::new(
                Some(signal.id.clone()),
                AuditEventType::SignalRejected,
                &signal.symbol,
                Some(signal.action),
                json!({}),
            ))
            .await;

        Ok(signal)
    }

    /// Move an approved signal into the deferred queue.
    async fn queue_signal(
        &self,
        state: &mut ExecutorState,
        mut signal: Signal,
        reason: &str,
    ) -> ExecutorResult<Signal> {
        signal.transition_to(SignalStatus::Queued)?;
        self.store
            .update_signal_status(
                signal.id.clone(),
                signal.status,
                StatusUpdate {
                    reason: Some(reason.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.audit
            .record_now(SignalEvent::new(
                Some(signal.id.clone()),
                AuditEventType::SignalQueued,
                &signal.symbol,
                Some(signal.action),
                json!({"reason": reason}),
            ))
            .await;

        state.queued.push_back(signal.clone());
        info!(id = signal.id.as_str(), symbol = %signal.symbol, reason, "signal queued");
        Ok(signal)
    }

    // ------------------------------------------------------------------
    // Queue replay
    // ------------------------------------------------------------------

    /// Drain the deferred queue once, FIFO, as a single batch.
    ///
    /// Invoked by an external periodic driver. Reentrant-safe: the state
    /// mutex is held for the entire batch, and every signal is removed
    /// from the queue before anything awaits on it, so a signal id
    /// executes at most once even under overlapping invocations.
    ///
    /// Funds are checked against a snapshot read fresh per signal, minus
    /// the amounts already spent earlier in the same batch, so two BUYs
    /// queued together cannot both spend the same balance.
    pub async fn process_queued_executions(&self) -> ExecutorResult<BatchSummary> {
        let mut state = self.state.lock().await;

        let batch: Vec<Signal> = state.queued.drain(..).collect();
        if batch.is_empty() {
            return Ok(BatchSummary::default());
        }
        debug!(batch = batch.len(), "processing queued executions");

        let mut summary = BatchSummary::default();
        let mut still_closed: VecDeque<Signal> = VecDeque::new();
        let mut requeue_tail: Vec<Signal> = Vec::new();
        let mut spent_in_batch = Amount::ZERO;

        for mut signal in batch {
            let hours = self.calendar.can_execute_order(Utc::now());
            if !hours.allowed {
                summary.deferred += 1;
                still_closed.push_back(signal);
                continue;
            }

            if signal.suggested_quantity == 0 {
                self.cancel_queued(&mut signal, "zero-quantity order").await?;
                summary.cancelled += 1;
                continue;
            }

            if signal.action == TradeAction::Buy {
                let snapshot = match read_account_snapshot(self.gateway.as_ref()).await {
                    Ok(s) => s,
                    Err(e) => {
                        // Uncertain balance: keep the signal queued, try
                        // again on the next pass.
                        warn!(
                            id = signal.id.as_str(),
                            error = %e,
                            "snapshot read failed during replay; deferring"
                        );
                        summary.requeued += 1;
                        requeue_tail.push(signal);
                        continue;
                    }
                };

                let required = signal
                    .suggested_amount
                    .pct(Decimal::from(100) + self.config.cash_margin_pct);
                let effective_cash = snapshot.available_cash - spent_in_batch;
                if effective_cash < required {
                    self.cancel_queued(
                        &mut signal,
                        &format!(
                            "insufficient funds: available {effective_cash}, required {required}"
                        ),
                    )
                    .await?;
                    summary.cancelled += 1;
                    continue;
                }
            }

            match self.place_order_for(&signal).await {
                Ok(receipt) if receipt.is_submitted() => {
                    if signal.action == TradeAction::Buy {
                        spent_in_batch = spent_in_batch + signal.suggested_amount;
                    }
                    signal.transition_to(SignalStatus::AutoExecuted)?;
                    signal.mark_placed(receipt.order_no.clone(), Utc::now());
                    self.store
                        .update_signal_status(
                            signal.id.clone(),
                            signal.status,
                            StatusUpdate {
                                executed_at: signal.executed_at,
                                order_no: signal.order_no.clone(),
                                ..Default::default()
                            },
                        )
                        .await?;
                    self.audit
                        .record_now(SignalEvent::new(
                            Some(signal.id.clone()),
                            AuditEventType::OrderAutoExecuted,
                            &signal.symbol,
                            Some(signal.action),
                            json!({"order_no": signal.order_no}),
                        ))
                        .await;
                    info!(id = signal.id.as_str(), symbol = %signal.symbol, "queued order executed");
                    summary.executed += 1;
                }
                Ok(receipt) => {
                    self.audit
                        .record_now(SignalEvent::new(
                            Some(signal.id.clone()),
                            AuditEventType::OrderPlacementFailed,
                            &signal.symbol,
                            Some(signal.action),
                            json!({"message": receipt.message, "requeued": true}),
                        ))
                        .await;
                    summary.requeued += 1;
                    requeue_tail.push(signal);
                }
                Err(e) => {
                    self.audit
                        .record_now(SignalEvent::new(
                            Some(signal.id.clone()),
                            AuditEventType::OrderPlacementFailed,
                            &signal.symbol,
                            Some(signal.action),
                            json!({"message": e.to_string(), "requeued": true}),
                        ))
                        .await;
                    summary.requeued += 1;
                    requeue_tail.push(signal);
                }
            }
        }

        // Closed-market signals keep their order; failed placements wait
        // at the tail for the next scheduled pass.
        still_closed.extend(requeue_tail);
        state.queued = still_closed;

        info!(
            executed = summary.executed,
            cancelled = summary.cancelled,
            requeued = summary.requeued,
            deferred = summary.deferred,
            "queued execution batch complete"
        );
        Ok(summary)
    }

    /// Terminate a queued signal without execution.
    async fn cancel_queued(&self, signal: &mut Signal, reason: &str) -> ExecutorResult<()> {
        signal.transition_to(SignalStatus::Cancelled)?;
        self.store
            .update_signal_status(
                signal.id.clone(),
                signal.status,
                StatusUpdate {
                    cancelled: true,
                    reason: Some(reason.to_string()),
                    ..Default::default()
                },
            )
            .await?;
        self.audit
            .record_now(SignalEvent::new(
                Some(signal.id.clone()),
                AuditEventType::SignalCancelled,
                &signal.symbol,
                Some(signal.action),
                json!({"reason": reason}),
            ))
            .await;
        warn!(id = signal.id.as_str(), symbol = %signal.symbol, reason, "queued signal cancelled");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Recovery and expiry
    // ------------------------------------------------------------------

    /// Rebuild the in-memory collections from durable storage.
    ///
    /// The sole recovery path after a crash or restart: rows still
    /// `queued` rejoin the deferred queue, rows still `pending` await
    /// their decision again.
    pub async fn restore_pending_signals(&self) -> ExecutorResult<(usize, usize)> {
        let mut state = self.state.lock().await;

        let rows = self.store.fetch_restorable().await?;
        let mut pending = 0usize;
        let mut queued = 0usize;

        for signal in rows {
            match signal.status {
                SignalStatus::Pending => {
                    state.pending.push(signal);
                    pending += 1;
                }
                SignalStatus::Queued => {
                    state.queued.push_back(signal);
                    queued += 1;
                }
                other => {
                    warn!(status = %other, "unexpected status in restorable rows; skipping");
                }
            }
        }

        self.audit
            .record_now(SignalEvent::new(
                None,
                AuditEventType::SignalsRestored,
                "*",
                None,
                json!({"pending": pending, "queued": queued}),
            ))
            .await;
        info!(pending, queued, "signals restored from storage");
        Ok((pending, queued))
    }

    /// Expire pending signals older than the configured age.
    pub async fn expire_stale_pending(&self, now: DateTime<Utc>) -> ExecutorResult<usize> {
        let mut state = self.state.lock().await;
        let cutoff = now - Duration::hours(self.config.pending_max_age_hours);

        let (stale, fresh): (Vec<Signal>, Vec<Signal>) = state
            .pending
            .drain(..)
            .partition(|s| s.created_at < cutoff);
        state.pending = fresh;

        let mut expired = 0usize;
        for mut signal in stale {
            signal.transition_to(SignalStatus::Expired)?;
            self.store
                .update_signal_status(
                    signal.id.clone(),
                    signal.status,
                    StatusUpdate {
                        reason: Some("pending past maximum age".to_string()),
                        ..Default::default()
                    },
                )
                .await?;
            self.audit
                .record_now(SignalEvent::new(
                    Some(signal.id.clone()),
                    AuditEventType::SignalExpired,
                    &signal.symbol,
                    Some(signal.action),
                    json!({}),
                ))
                .await;
            expired += 1;
        }

        if expired > 0 {
            info!(expired, "stale pending signals expired");
        }
        Ok(expired)
    }

    // ------------------------------------------------------------------
    // Order placement
    // ------------------------------------------------------------------

    /// Place a market order for `signal`.
    ///
    /// Callers guarantee the signal has an order side and a non-zero
    /// quantity; a HOLD reaching this point is a logic error and is
    /// reported as a failed receipt rather than a panic.
    async fn place_order_for(
        &self,
        signal: &Signal,
    ) -> Result<OrderReceipt, sentinel_broker::BrokerError> {
        let side = match signal.action.order_side() {
            Some(side) => side,
            None => {
                return Ok(OrderReceipt {
                    status: sentinel_broker::OrderStatus::Failed,
                    order_no: None,
                    message: "HOLD signal has no order side".to_string(),
                })
            }
        };

        self.gateway
            .place_order(OrderRequest {
                symbol: signal.symbol.clone(),
                side,
                quantity: signal.suggested_quantity,
                price: Price::ZERO,
                order_type: OrderType::Market,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    use sentinel_audit::MemorySink;
    use sentinel_broker::{AccountBalance, HoursDecision, MockGateway, OrderStatus};
    use sentinel_persistence::MemorySignalStore;
    use sentinel_risk::RiskLimits;

    /// Calendar whose answer can be flipped mid-test.
    struct ToggleCalendar {
        open: AtomicBool,
    }

    impl ToggleCalendar {
        fn new(open: bool) -> Self {
            Self {
                open: AtomicBool::new(open),
            }
        }

        fn set_open(&self, open: bool) {
            self.open.store(open, Ordering::Release);
        }
    }

    impl TradingCalendar for ToggleCalendar {
        fn can_execute_order(&self, _now: DateTime<Utc>) -> HoursDecision {
            if self.open.load(Ordering::Acquire) {
                HoursDecision {
                    allowed: true,
                    reason: "open".to_string(),
                }
            } else {
                HoursDecision {
                    allowed: false,
                    reason: "closed".to_string(),
                }
            }
        }
    }

    struct Harness {
        executor: Arc<SignalExecutor>,
        gateway: Arc<MockGateway>,
        calendar: Arc<ToggleCalendar>,
        store: Arc<MemorySignalStore>,
        sink: Arc<MemorySink>,
    }

    fn harness(market_open: bool) -> Harness {
        let gateway = Arc::new(MockGateway::new());
        // Default account: plenty of cash, nothing held.
        gateway.set_balance(AccountBalance {
            available_amount: Amount::new(dec!(10000000)),
            total_evaluation: Amount::new(dec!(0)),
        });

        let calendar = Arc::new(ToggleCalendar::new(market_open));
        let store = Arc::new(MemorySignalStore::new());
        let sink = Arc::new(MemorySink::new());

        let executor = SignalExecutor::new(
            gateway.clone(),
            calendar.clone(),
            store.clone(),
            AuditRecorder::new(sink.clone()),
            RiskGate::new(RiskLimits::default()),
            Arc::new(DataQualityGate::new()),
            ClassifierConfig::default(),
            PriceBands::default(),
            ExecutorConfig::default(),
        );

        Harness {
            executor: Arc::new(executor),
            gateway,
            calendar,
            store,
            sink,
        }
    }

    fn proposal(symbol: &str, amount: Decimal) -> TradeProposal {
        TradeProposal {
            symbol: symbol.to_string(),
            company_name: "Test Corp".to_string(),
            current_price: Price::new(dec!(100000)),
            final_percent: 15.0,
            scores: AgentScores::new(7.0, 7.0, 8.0),
            confidence: 0.8,
            trigger_source: "news".to_string(),
            suggested_quantity: 10,
            suggested_amount: Amount::new(amount),
            proposed_stop_loss: None,
            proposed_target: None,
        }
    }

    fn queued_signal(symbol: &str, amount: Decimal) -> Signal {
        Signal {
            id: SignalId::new(),
            symbol: symbol.to_string(),
            company_name: "Test Corp".to_string(),
            action: TradeAction::Buy,
            suggested_quantity: 10,
            suggested_amount: Amount::new(amount),
            target_price: Price::new(dec!(120000)),
            stop_loss: Price::new(dec!(95000)),
            confidence: 0.8,
            quant_score: 7.0,
            fundamental_score: 7.0,
            trigger_source: "news".to_string(),
            status: SignalStatus::Queued,
            created_at: Utc::now(),
            executed_at: None,
            order_no: None,
        }
    }

    async fn restore_one(h: &Harness, signal: Signal) {
        h.store.push_restorable(signal);
        h.executor.restore_pending_signals().await.unwrap();
    }

    // === Admission ===

    #[tokio::test]
    async fn test_admit_clean_buy_becomes_pending() {
        let h = harness(true);

        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        assert_eq!(signal.status, SignalStatus::Pending);
        assert_eq!(signal.action, TradeAction::Buy);
        // Absent proposals get the default exit bands.
        assert_eq!(signal.stop_loss, Price::new(dec!(95000)));
        assert_eq!(signal.target_price, Price::new(dec!(120000)));
        assert_eq!(h.executor.pending_count().await, 1);
        assert_eq!(h.store.status_of(&signal.id), Some(SignalStatus::Pending));
    }

    #[tokio::test]
    async fn test_admit_blocked_by_gate_a_rejects() {
        let h = harness(true);

        // 10,000,000 total at 8% -> minimum 800,000; 500,000 is too small.
        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(500000)))
            .await
            .unwrap();

        assert_eq!(signal.status, SignalStatus::Rejected);
        assert_eq!(h.executor.pending_count().await, 0);

        let events = h.sink.events();
        assert!(events
            .iter()
            .any(|e| e.event_type == AuditEventType::GateBlocked && e.details["gate"] == "A"));
    }

    #[tokio::test]
    async fn test_admit_data_quality_block() {
        let h = harness(true);
        // Two feed failures mark the symbol unhealthy.
        h.executor.data_quality.record_failure("005930");
        h.executor.data_quality.record_failure("005930");

        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        assert_eq!(signal.status, SignalStatus::Rejected);
        let events = h.sink.events();
        assert!(events.iter().any(|e| e.event_type == AuditEventType::GateBlocked
            && e.details["gate"] == "data_quality"));
    }

    #[tokio::test]
    async fn test_admit_fails_closed_when_snapshot_unavailable() {
        let h = harness(true);
        h.gateway.set_snapshot_unavailable(true);

        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        assert_eq!(signal.status, SignalStatus::Rejected);
        assert!(h.gateway.placed_orders().is_empty());
    }

    #[tokio::test]
    async fn test_admit_zero_quantity_buy_becomes_hold() {
        let h = harness(true);
        let mut p = proposal("005930", dec!(2000000));
        p.suggested_quantity = 0;

        let signal = h.executor.admit_signal(p).await.unwrap();

        assert_eq!(signal.action, TradeAction::Hold);
        assert_eq!(signal.status, SignalStatus::Pending);
    }

    // === Approval ===

    #[tokio::test]
    async fn test_approve_buy_market_open_executes() {
        let h = harness(true);
        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        let approved = h.executor.approve_signal(&signal.id).await.unwrap();

        assert_eq!(approved.status, SignalStatus::Executed);
        assert!(approved.executed_at.is_some());
        assert!(approved.order_no.is_some());
        assert_eq!(h.gateway.placed_orders().len(), 1);
        assert_eq!(h.executor.queued_count().await, 0);
        assert_eq!(h.store.status_of(&signal.id), Some(SignalStatus::Executed));
    }

    #[tokio::test]
    async fn test_approve_market_closed_queues() {
        let h = harness(false);
        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        let approved = h.executor.approve_signal(&signal.id).await.unwrap();

        assert_eq!(approved.status, SignalStatus::Queued);
        assert!(h.gateway.placed_orders().is_empty());
        assert_eq!(h.executor.queued_count().await, 1);
    }

    #[tokio::test]
    async fn test_approve_hold_never_places_order() {
        let h = harness(true);
        // Low allocation classifies as HOLD.
        let mut p = proposal("005930", dec!(2000000));
        p.final_percent = 5.0;
        let signal = h.executor.admit_signal(p).await.unwrap();
        assert_eq!(signal.action, TradeAction::Hold);

        let approved = h.executor.approve_signal(&signal.id).await.unwrap();

        assert_eq!(approved.status, SignalStatus::Approved);
        assert!(h.gateway.placed_orders().is_empty());
        assert_eq!(h.executor.queued_count().await, 0);
    }

    #[tokio::test]
    async fn test_approve_placement_failure_requeues() {
        let h = harness(true);
        h.gateway.push_receipt(OrderReceipt {
            status: OrderStatus::Failed,
            order_no: None,
            message: "exchange rejected".to_string(),
        });
        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        let approved = h.executor.approve_signal(&signal.id).await.unwrap();

        // Placement failure is not an error to the caller.
        assert_eq!(approved.status, SignalStatus::Queued);
        assert_eq!(h.executor.queued_count().await, 1);
    }

    #[tokio::test]
    async fn test_approve_unknown_id_errors() {
        let h = harness(true);
        let missing = SignalId::new();

        let result = h.executor.approve_signal(&missing).await;
        assert!(matches!(result, Err(ExecutorError::SignalNotFound(_))));
    }

    #[tokio::test]
    async fn test_reject_never_calls_brokerage() {
        let h = harness(true);
        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        let rejected = h.executor.reject_signal(&signal.id).await.unwrap();

        assert_eq!(rejected.status, SignalStatus::Rejected);
        assert!(h.gateway.placed_orders().is_empty());
        assert_eq!(h.executor.pending_count().await, 0);
    }

    #[tokio::test]
    async fn test_reject_works_with_market_closed() {
        let h = harness(false);
        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();

        let rejected = h.executor.reject_signal(&signal.id).await.unwrap();
        assert_eq!(rejected.status, SignalStatus::Rejected);
        assert!(h.gateway.placed_orders().is_empty());
    }

    // === Queue replay ===

    #[tokio::test]
    async fn test_closed_to_open_auto_executes() {
        let h = harness(false);
        let signal = h
            .executor
            .admit_signal(proposal("005930", dec!(2000000)))
            .await
            .unwrap();
        h.executor.approve_signal(&signal.id).await.unwrap();
        assert_eq!(h.executor.queued_count().await, 1);

        // Still closed: nothing happens.
        let summary = h.executor.process_queued_executions().await.unwrap();
        assert_eq!(summary.deferred, 1);
        assert_eq!(h.executor.queued_count().await, 1);

        // Market opens: the queued signal executes and leaves the queue.
        h.calendar.set_open(true);
        let summary = h.executor.process_queued_executions().await.unwrap();
        assert_eq!(summary.executed, 1);
        assert_eq!(h.executor.queued_count().await, 0);
        assert_eq!(
            h.store.status_of(&signal.id),
            Some(SignalStatus::AutoExecuted)
        );
    }

    #[tokio::test]
    async fn test_insufficient_funds_cancels_without_placement() {
        let h = harness(true);
        h.gateway.set_balance(AccountBalance {
            available_amount: Amount::new(dec!(500000)),
            total_evaluation: Amount::new(dec!(0)),
        });
        let signal = queued_signal("005930", dec!(2000000));
        let id = signal.id.clone();
        restore_one(&h, signal).await;

        let summary = h.executor.process_queued_executions().await.unwrap();

        assert_eq!(summary.cancelled, 1);
        assert!(h.gateway.placed_orders().is_empty());
        assert_eq!(h.executor.queued_count().await, 0);
        assert_eq!(h.store.status_of(&id), Some(SignalStatus::Cancelled));
        let (_, _, update) = h
            .store
            .updates()
            .into_iter()
            .find(|(uid, _, _)| uid == &id)
            .unwrap();
        assert!(update.cancelled);

        // A cancelled signal never reappears.
        let summary = h.executor.process_queued_executions().await.unwrap();
        assert_eq!(summary, BatchSummary::default());
    }

    #[tokio::test]
    async fn test_batch_cannot_overspend_shared_balance() {
        let h = harness(true);
        h.gateway.set_balance(AccountBalance {
            available_amount: Amount::new(dec!(1000000)),
            total_evaluation: Amount::new(dec!(0)),
        });
        let first = queued_signal("005930", dec!(600000));
        let second = queued_signal("000660", dec!(600000));
        let second_id = second.id.clone();
        h.store.push_restorable(first);
        h.store.push_restorable(second);
        h.executor.restore_pending_signals().await.unwrap();

        let summary = h.executor.process_queued_executions().await.unwrap();

        // Both see the same 1,000,000 balance, but the batch-local spend
        // tracker stops the second buy.
        assert_eq!(summary.executed, 1);
        assert_eq!(summary.cancelled, 1);
        assert_eq!(h.gateway.placed_orders().len(), 1);
        assert_eq!(h.store.status_of(&second_id), Some(SignalStatus::Cancelled));
        // Snapshot was read fresh for each signal.
        assert_eq!(h.gateway.balance_reads(), 2);
    }

    #[tokio::test]
    async fn test_failed_placement_requeued_for_next_pass() {
        let h = harness(true);
        h.gateway.push_receipt(OrderReceipt {
            status: OrderStatus::Failed,
            order_no: None,
            message: "exchange hiccup".to_string(),
        });
        let signal = queued_signal("005930", dec!(600000));
        let id = signal.id.clone();
        restore_one(&h, signal).await;

        let summary = h.executor.process_queued_executions().await.unwrap();
        assert_eq!(summary.requeued, 1);
        assert_eq!(h.executor.queued_count().await, 1);
        // Exactly one attempt this batch, no mid-batch retry.
        assert_eq!(h.gateway.placed_orders().len(), 1);

        // Next pass succeeds (mock auto-submits once receipts run out).
        let summary = h.executor.process_queued_executions().await.unwrap();
        assert_eq!(summary.executed, 1);
        assert_eq!(h.store.status_of(&id), Some(SignalStatus::AutoExecuted));
    }

    #[tokio::test]
    async fn test_overlapping_replay_executes_each_signal_once() {
        let h = harness(true);
        restore_one(&h, queued_signal("005930", dec!(600000))).await;

        let (a, b) = tokio::join!(
            h.executor.process_queued_executions(),
            h.executor.process_queued_executions()
        );

        let total = a.unwrap().executed + b.unwrap().executed;
        assert_eq!(total, 1);
        assert_eq!(h.gateway.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_sell_replay_skips_cash_check() {
        let h = harness(true);
        h.gateway.set_balance(AccountBalance {
            available_amount: Amount::new(dec!(0)),
            total_evaluation: Amount::new(dec!(1000000)),
        });
        let mut signal = queued_signal("005930", dec!(600000));
        signal.action = TradeAction::Sell;
        restore_one(&h, signal).await;

        let summary = h.executor.process_queued_executions().await.unwrap();
        assert_eq!(summary.executed, 1);
    }

    // === Recovery and expiry ===

    #[tokio::test]
    async fn test_restore_splits_pending_and_queued() {
        let h = harness(true);
        let mut pending = queued_signal("005930", dec!(600000));
        pending.status = SignalStatus::Pending;
        h.store.push_restorable(pending);
        h.store.push_restorable(queued_signal("000660", dec!(600000)));

        let (restored_pending, restored_queued) =
            h.executor.restore_pending_signals().await.unwrap();

        assert_eq!((restored_pending, restored_queued), (1, 1));
        assert_eq!(h.executor.pending_count().await, 1);
        assert_eq!(h.executor.queued_count().await, 1);
    }

    #[tokio::test]
    async fn test_expire_stale_pending() {
        let h = harness(true);
        let mut old = queued_signal("005930", dec!(600000));
        old.status = SignalStatus::Pending;
        old.created_at = Utc::now() - Duration::hours(48);
        let old_id = old.id.clone();
        let mut fresh = queued_signal("000660", dec!(600000));
        fresh.status = SignalStatus::Pending;
        h.store.push_restorable(old);
        h.store.push_restorable(fresh);
        h.executor.restore_pending_signals().await.unwrap();

        let expired = h.executor.expire_stale_pending(Utc::now()).await.unwrap();

        assert_eq!(expired, 1);
        assert_eq!(h.executor.pending_count().await, 1);
        assert_eq!(h.store.status_of(&old_id), Some(SignalStatus::Expired));
    }
}
