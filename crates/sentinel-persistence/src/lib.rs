//! Durable signal rows and audit events.
//!
//! Sqlite-backed storage for two concerns:
//! - `signals`: one row per signal, updated on every lifecycle
//!   transition; the sole recovery source after a restart
//! - `signal_events`: append-only audit trail, written best-effort
//!   through `SqliteAuditSink`

pub mod audit_sink;
pub mod db;
pub mod error;
pub mod store;

pub use audit_sink::SqliteAuditSink;
pub use db::{connect, init_schema};
pub use error::{PersistenceError, PersistenceResult};
pub use store::{MemorySignalStore, SignalStore, SqliteSignalStore, StatusUpdate};
