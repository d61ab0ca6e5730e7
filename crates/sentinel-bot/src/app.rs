//! Application wiring and the periodic queue driver.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tokio::time::interval;
use tracing::{error, info, warn};

use sentinel_audit::AuditRecorder;
use sentinel_broker::RestGateway;
use sentinel_executor::SignalExecutor;
use sentinel_persistence::{connect, SqliteAuditSink, SqliteSignalStore};
use sentinel_risk::{DataQualityGate, RiskGate};

use crate::config::AppConfig;
use crate::error::AppResult;

/// The assembled service.
///
/// Owns the pool and the executor; constructed once at startup, torn
/// down when `run` returns. No ambient globals.
pub struct Application {
    config: AppConfig,
    pool: SqlitePool,
    executor: Arc<SignalExecutor>,
}

impl Application {
    /// Build every component from configuration.
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let pool = connect(&config.database.path).await?;

        let store = Arc::new(SqliteSignalStore::new(pool.clone()));
        let audit = AuditRecorder::new(Arc::new(SqliteAuditSink::new(pool.clone())));
        let gateway = Arc::new(RestGateway::new(
            config.broker.base_url.clone(),
            config.broker.resolved_token(),
        )?);
        let calendar = Arc::new(config.calendar.clone());

        let executor = Arc::new(SignalExecutor::new(
            gateway,
            calendar,
            store,
            audit,
            RiskGate::new(config.risk.clone()),
            Arc::new(DataQualityGate::new()),
            config.classifier.clone(),
            config.bands.clone(),
            config.executor.clone(),
        ));

        Ok(Self {
            config,
            pool,
            executor,
        })
    }

    /// Handle for the delivery layer to drive admission and approval.
    #[must_use]
    pub fn executor(&self) -> Arc<SignalExecutor> {
        Arc::clone(&self.executor)
    }

    /// Restore state, then drive the queue until shutdown.
    pub async fn run(&mut self) -> AppResult<()> {
        let (pending, queued) = self.executor.restore_pending_signals().await?;
        info!(pending, queued, "startup recovery complete");

        let mut queue_ticker = interval(Duration::from_secs(self.config.driver.queue_interval_secs));
        let mut expiry_ticker =
            interval(Duration::from_secs(self.config.driver.expiry_interval_secs));

        loop {
            tokio::select! {
                _ = queue_ticker.tick() => {
                    match self.executor.process_queued_executions().await {
                        Ok(summary) => {
                            if summary != Default::default() {
                                info!(?summary, "queue replay pass");
                            }
                        }
                        // The driver never dies on a failed pass; the
                        // queue is retried on the next tick.
                        Err(e) => warn!(error = %e, "queue replay pass failed"),
                    }
                }
                _ = expiry_ticker.tick() => {
                    if let Err(e) = self.executor.expire_stale_pending(Utc::now()).await {
                        warn!(error = %e, "expiry sweep failed");
                    }
                }
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        error!(error = %e, "signal handler failure");
                    }
                    info!("shutdown requested");
                    break;
                }
            }
        }

        self.pool.close().await;
        info!("shutdown complete");
        Ok(())
    }
}
