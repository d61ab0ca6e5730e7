//! Sqlite audit sink.

use sqlx::sqlite::SqlitePool;

use sentinel_audit::{AuditError, AuditResult, AuditSink};
use sentinel_core::{BoxFuture, SignalEvent};

/// Appends `signal_events` rows.
///
/// Each append acquires its own connection from the pool and releases it
/// on every exit path; the recorder above this sink swallows failures.
pub struct SqliteAuditSink {
    pool: SqlitePool,
}

impl SqliteAuditSink {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl AuditSink for SqliteAuditSink {
    fn append(&self, event: SignalEvent) -> BoxFuture<'_, AuditResult<()>> {
        Box::pin(async move {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| AuditError::Sink(format!("acquire failed: {e}")))?;

            sqlx::query(
                r#"
                    INSERT INTO signal_events (signal_id, event_type, symbol, action, details, created_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.signal_id.as_ref().map(|id| id.as_str().to_string()))
            .bind(event.event_type.as_str())
            .bind(&event.symbol)
            .bind(event.action.map(|a| a.as_str().to_string()))
            .bind(event.details.to_string())
            .bind(event.created_at)
            .execute(&mut *conn)
            .await
            .map_err(|e| AuditError::Sink(format!("insert failed: {e}")))?;

            Ok(())
        })
    }
}
