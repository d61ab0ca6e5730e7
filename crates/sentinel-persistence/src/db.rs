//! Sqlite pool setup and schema.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{self, SqliteConnectOptions, SqlitePool};
use tracing::info;

use crate::error::PersistenceResult;

/// Open (or create) the database at `path` and prepare the schema.
pub async fn connect(path: &str) -> PersistenceResult<SqlitePool> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))?
        .create_if_missing(true)
        .journal_mode(sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlite::SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    let pool = SqlitePool::connect_with(options).await?;
    init_schema(&pool).await?;

    info!(path, "signal database ready");
    Ok(pool)
}

/// Create tables and indexes if missing. Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::query(
        r#"
            CREATE TABLE IF NOT EXISTS signals(
                id TEXT PRIMARY KEY NOT NULL,
                symbol TEXT NOT NULL,
                company_name TEXT NOT NULL,
                signal_type TEXT NOT NULL,
                strength REAL NOT NULL,
                quantity INTEGER NOT NULL,
                target_price TEXT NOT NULL,
                stop_loss TEXT NOT NULL,
                signal_status TEXT NOT NULL,
                reason TEXT,
                suggested_amount TEXT NOT NULL,
                allocation_percent REAL NOT NULL,
                quant_score REAL NOT NULL,
                fundamental_score REAL NOT NULL,
                trigger_source TEXT NOT NULL,
                cancelled INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                executed_at TEXT,
                order_no TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_signals_status ON signals(signal_status);
            CREATE INDEX IF NOT EXISTS idx_signals_symbol ON signals(symbol);

            CREATE TABLE IF NOT EXISTS signal_events(
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                signal_id TEXT,
                event_type TEXT NOT NULL,
                symbol TEXT NOT NULL,
                action TEXT,
                details TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_signal ON signal_events(signal_id);
            CREATE INDEX IF NOT EXISTS idx_events_created ON signal_events(created_at);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
