//! Signal row storage.
//!
//! One row per signal, keyed by id. Rows are inserted at admission and
//! updated on every lifecycle transition; rows still `pending` or
//! `queued` at startup are the recovery source for the in-memory queues.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use tracing::debug;

use sentinel_core::{Amount, BoxFuture, Price, Signal, SignalId, SignalStatus, TradeAction};

use crate::error::{PersistenceError, PersistenceResult};

/// Extra columns written alongside a status change.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    /// Execution timestamp, for executed/auto-executed transitions.
    pub executed_at: Option<DateTime<Utc>>,
    /// Brokerage order number, for successful placements.
    pub order_no: Option<String>,
    /// Cancellation flag, for insufficient-funds terminations.
    pub cancelled: bool,
    /// Human-readable reason (gate block, cancellation cause).
    pub reason: Option<String>,
}

/// Trait for durable signal storage.
///
/// Object-safe so the executor can hold `Arc<dyn SignalStore>`.
pub trait SignalStore: Send + Sync {
    /// Insert a freshly admitted signal.
    ///
    /// `allocation_percent` is the upstream funding percentage, kept on
    /// the row for downstream readers of the signal table. `reason`
    /// records why a signal was rejected at admission, when it was.
    fn insert_signal(
        &self,
        signal: Signal,
        allocation_percent: f64,
        reason: Option<String>,
    ) -> BoxFuture<'_, PersistenceResult<()>>;

    /// Record a lifecycle transition.
    fn update_signal_status(
        &self,
        id: SignalId,
        status: SignalStatus,
        update: StatusUpdate,
    ) -> BoxFuture<'_, PersistenceResult<()>>;

    /// Rows still `pending` or `queued`, oldest first.
    fn fetch_restorable(&self) -> BoxFuture<'_, PersistenceResult<Vec<Signal>>>;
}

/// Sqlite-backed signal store.
pub struct SqliteSignalStore {
    pool: SqlitePool,
}

impl SqliteSignalStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_signal(row: &sqlx::sqlite::SqliteRow) -> PersistenceResult<Signal> {
        let id: String = row.try_get("id")?;

        let corrupt = |reason: String| PersistenceError::CorruptRow {
            id: id.clone(),
            reason,
        };

        let action: String = row.try_get("signal_type")?;
        let action = TradeAction::from_str(&action).map_err(|e| corrupt(e.to_string()))?;

        let status: String = row.try_get("signal_status")?;
        let status = SignalStatus::from_str(&status).map_err(|e| corrupt(e.to_string()))?;

        let target_price: String = row.try_get("target_price")?;
        let target_price = Price::from_str(&target_price)
            .map_err(|e| corrupt(format!("bad target_price: {e}")))?;

        let stop_loss: String = row.try_get("stop_loss")?;
        let stop_loss =
            Price::from_str(&stop_loss).map_err(|e| corrupt(format!("bad stop_loss: {e}")))?;

        let suggested_amount: String = row.try_get("suggested_amount")?;
        let suggested_amount = Amount::from_str(&suggested_amount)
            .map_err(|e| corrupt(format!("bad suggested_amount: {e}")))?;

        let quantity: i64 = row.try_get("quantity")?;
        let quantity =
            u32::try_from(quantity).map_err(|_| corrupt(format!("bad quantity: {quantity}")))?;

        Ok(Signal {
            id: SignalId::from_string(id.clone()),
            symbol: row.try_get("symbol")?,
            company_name: row.try_get("company_name")?,
            action,
            suggested_quantity: quantity,
            suggested_amount,
            target_price,
            stop_loss,
            confidence: row.try_get("strength")?,
            quant_score: row.try_get("quant_score")?,
            fundamental_score: row.try_get("fundamental_score")?,
            trigger_source: row.try_get("trigger_source")?,
            status,
            created_at: row.try_get("created_at")?,
            executed_at: row.try_get("executed_at")?,
            order_no: row.try_get("order_no")?,
        })
    }
}

impl SignalStore for SqliteSignalStore {
    fn insert_signal(
        &self,
        signal: Signal,
        allocation_percent: f64,
        reason: Option<String>,
    ) -> BoxFuture<'_, PersistenceResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                    INSERT INTO signals (
                        id, symbol, company_name, signal_type, strength, quantity,
                        target_price, stop_loss, signal_status, reason, suggested_amount,
                        allocation_percent, quant_score, fundamental_score,
                        trigger_source, created_at, executed_at, order_no
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(signal.id.as_str())
            .bind(&signal.symbol)
            .bind(&signal.company_name)
            .bind(signal.action.as_str())
            .bind(signal.confidence)
            .bind(i64::from(signal.suggested_quantity))
            .bind(signal.target_price.to_string())
            .bind(signal.stop_loss.to_string())
            .bind(signal.status.as_str())
            .bind(&reason)
            .bind(signal.suggested_amount.to_string())
            .bind(allocation_percent)
            .bind(signal.quant_score)
            .bind(signal.fundamental_score)
            .bind(&signal.trigger_source)
            .bind(signal.created_at)
            .bind(signal.executed_at)
            .bind(&signal.order_no)
            .execute(&self.pool)
            .await?;

            debug!(id = signal.id.as_str(), status = %signal.status, "signal row inserted");
            Ok(())
        })
    }

    fn update_signal_status(
        &self,
        id: SignalId,
        status: SignalStatus,
        update: StatusUpdate,
    ) -> BoxFuture<'_, PersistenceResult<()>> {
        Box::pin(async move {
            sqlx::query(
                r#"
                    UPDATE signals
                    SET signal_status = ?,
                        executed_at = COALESCE(?, executed_at),
                        order_no = COALESCE(?, order_no),
                        cancelled = ?,
                        reason = COALESCE(?, reason)
                    WHERE id = ?
                "#,
            )
            .bind(status.as_str())
            .bind(update.executed_at)
            .bind(&update.order_no)
            .bind(i64::from(update.cancelled))
            .bind(&update.reason)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

            debug!(id = id.as_str(), status = %status, "signal row updated");
            Ok(())
        })
    }

    fn fetch_restorable(&self) -> BoxFuture<'_, PersistenceResult<Vec<Signal>>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r#"
                    SELECT id, symbol, company_name, signal_type, strength, quantity,
                           target_price, stop_loss, signal_status, suggested_amount,
                           quant_score, fundamental_score, trigger_source,
                           created_at, executed_at, order_no
                    FROM signals
                    WHERE signal_status IN ('pending', 'queued')
                    ORDER BY created_at ASC
                "#,
            )
            .fetch_all(&self.pool)
            .await?;

            rows.iter().map(Self::row_to_signal).collect()
        })
    }
}

/// In-memory store for tests of dependents.
///
/// Records inserts and status updates; `fetch_restorable` returns
/// whatever was preloaded with `push_restorable`.
#[derive(Default)]
pub struct MemorySignalStore {
    inserted: Mutex<Vec<Signal>>,
    updates: Mutex<Vec<(SignalId, SignalStatus, StatusUpdate)>>,
    restorable: Mutex<Vec<Signal>>,
    statuses: Mutex<HashMap<String, SignalStatus>>,
}

impl MemorySignalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a row for `fetch_restorable`.
    pub fn push_restorable(&self, signal: Signal) {
        self.restorable.lock().push(signal);
    }

    /// Signals inserted so far.
    pub fn inserted(&self) -> Vec<Signal> {
        self.inserted.lock().clone()
    }

    /// Status updates recorded so far, in order.
    pub fn updates(&self) -> Vec<(SignalId, SignalStatus, StatusUpdate)> {
        self.updates.lock().clone()
    }

    /// Last status written for `id`, from inserts or updates.
    pub fn status_of(&self, id: &SignalId) -> Option<SignalStatus> {
        self.statuses.lock().get(id.as_str()).copied()
    }
}

impl SignalStore for MemorySignalStore {
    fn insert_signal(
        &self,
        signal: Signal,
        _allocation_percent: f64,
        _reason: Option<String>,
    ) -> BoxFuture<'_, PersistenceResult<()>> {
        Box::pin(async move {
            self.statuses
                .lock()
                .insert(signal.id.as_str().to_string(), signal.status);
            self.inserted.lock().push(signal);
            Ok(())
        })
    }

    fn update_signal_status(
        &self,
        id: SignalId,
        status: SignalStatus,
        update: StatusUpdate,
    ) -> BoxFuture<'_, PersistenceResult<()>> {
        Box::pin(async move {
            self.statuses
                .lock()
                .insert(id.as_str().to_string(), status);
            self.updates.lock().push((id, status, update));
            Ok(())
        })
    }

    fn fetch_restorable(&self) -> BoxFuture<'_, PersistenceResult<Vec<Signal>>> {
        Box::pin(async move { Ok(self.restorable.lock().clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use rust_decimal_macros::dec;

    fn sample_signal(status: SignalStatus) -> Signal {
        Signal {
            id: SignalId::new(),
            symbol: "005930".to_string(),
            company_name: "Samsung Electronics".to_string(),
            action: TradeAction::Buy,
            suggested_quantity: 10,
            suggested_amount: Amount::new(dec!(700000)),
            target_price: Price::new(dec!(84000)),
            stop_loss: Price::new(dec!(66500)),
            confidence: 0.8,
            quant_score: 7.0,
            fundamental_score: 8.0,
            trigger_source: "news".to_string(),
            status,
            created_at: Utc::now(),
            executed_at: None,
            order_no: None,
        }
    }

    async fn temp_store() -> (tempfile::TempDir, SqliteSignalStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.db");
        let pool = db::connect(path.to_str().unwrap()).await.unwrap();
        (dir, SqliteSignalStore::new(pool))
    }

    #[tokio::test]
    async fn test_insert_and_restore_round_trip() {
        let (_dir, store) = temp_store().await;

        let pending = sample_signal(SignalStatus::Pending);
        let queued = sample_signal(SignalStatus::Queued);
        store
            .insert_signal(pending.clone(), 12.5, None)
            .await
            .unwrap();
        store.insert_signal(queued.clone(), 8.0, None).await.unwrap();

        let restored = store.fetch_restorable().await.unwrap();
        assert_eq!(restored.len(), 2);

        let ids: Vec<&str> = restored.iter().map(|s| s.id.as_str()).collect();
        assert!(ids.contains(&pending.id.as_str()));
        assert!(ids.contains(&queued.id.as_str()));

        let restored_pending = restored
            .iter()
            .find(|s| s.id == pending.id)
            .expect("pending row restored");
        assert_eq!(restored_pending.status, SignalStatus::Pending);
        assert_eq!(restored_pending.suggested_amount, Amount::new(dec!(700000)));
        assert_eq!(restored_pending.target_price, Price::new(dec!(84000)));
    }

    #[tokio::test]
    async fn test_terminal_rows_not_restorable() {
        let (_dir, store) = temp_store().await;

        let signal = sample_signal(SignalStatus::Pending);
        let id = signal.id.clone();
        store.insert_signal(signal, 10.0, None).await.unwrap();

        store
            .update_signal_status(
                id,
                SignalStatus::Rejected,
                StatusUpdate {
                    reason: Some("operator rejection".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let restored = store.fetch_restorable().await.unwrap();
        assert!(restored.is_empty());
    }

    #[tokio::test]
    async fn test_update_preserves_earlier_columns() {
        let (_dir, store) = temp_store().await;

        let signal = sample_signal(SignalStatus::Queued);
        let id = signal.id.clone();
        store.insert_signal(signal, 10.0, None).await.unwrap();

        let executed_at = Utc::now();
        store
            .update_signal_status(
                id.clone(),
                SignalStatus::AutoExecuted,
                StatusUpdate {
                    executed_at: Some(executed_at),
                    order_no: Some("ORD00000001".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // A later update without order_no must not clear it.
        store
            .update_signal_status(
                id.clone(),
                SignalStatus::AutoExecuted,
                StatusUpdate::default(),
            )
            .await
            .unwrap();

        let row = sqlx::query("SELECT order_no, signal_status FROM signals WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let order_no: Option<String> = row.try_get("order_no").unwrap();
        assert_eq!(order_no.as_deref(), Some("ORD00000001"));
    }
}
