//! Fire-and-forget audit recorder.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use sentinel_core::{BoxFuture, SignalEvent};

use crate::bus::EventBus;
use crate::error::AuditResult;

/// Trait for the durable audit sink.
///
/// Appends exactly one event per call. Implementations acquire and
/// release any connection within the call; failures are reported as
/// `Err` and the recorder decides what to do with them (log and drop).
pub trait AuditSink: Send + Sync {
    fn append(&self, event: SignalEvent) -> BoxFuture<'_, AuditResult<()>>;
}

/// Best-effort audit recorder.
///
/// `record` never blocks or fails the caller: the sink append runs on a
/// spawned task, a sink error is logged at warn and dropped, and bus
/// listeners are isolated from each other. One structured log line is
/// emitted per recorded event.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: Arc<dyn AuditSink>,
    bus: EventBus,
}

impl AuditRecorder {
    /// Create a recorder over `sink` with a fresh bus.
    #[must_use]
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self {
            sink,
            bus: EventBus::new(),
        }
    }

    /// The bus observers register on.
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Record an event: log, fan out, and append in the background.
    pub fn record(&self, event: SignalEvent) {
        info!(
            event_type = %event.event_type,
            signal_id = event.signal_id.as_ref().map(|id| id.as_str()),
            symbol = %event.symbol,
            "audit event"
        );

        self.bus.emit(&event);

        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            if let Err(e) = sink.append(event.clone()).await {
                warn!(
                    event_type = %event.event_type,
                    error = %e,
                    "audit append failed; event dropped"
                );
            }
        });
    }

    /// Record and wait for the sink append.
    ///
    /// Still swallow-and-log: used where the caller is about to shut
    /// down and a spawned task would be cancelled.
    pub async fn record_now(&self, event: SignalEvent) {
        info!(
            event_type = %event.event_type,
            signal_id = event.signal_id.as_ref().map(|id| id.as_str()),
            symbol = %event.symbol,
            "audit event"
        );

        self.bus.emit(&event);

        if let Err(e) = self.sink.append(event.clone()).await {
            warn!(
                event_type = %event.event_type,
                error = %e,
                "audit append failed; event dropped"
            );
        }
    }
}

/// In-memory sink recording appended events, for tests of dependents.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SignalEvent>>,
    fail: Mutex<bool>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent appends fail.
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock() = fail;
    }

    /// Events appended so far.
    pub fn events(&self) -> Vec<SignalEvent> {
        self.events.lock().clone()
    }
}

impl AuditSink for MemorySink {
    fn append(&self, event: SignalEvent) -> BoxFuture<'_, AuditResult<()>> {
        Box::pin(async move {
            if *self.fail.lock() {
                return Err(crate::error::AuditError::Sink(
                    "memory sink set to fail".to_string(),
                ));
            }
            self.events.lock().push(event);
            Ok(())
        })
    }
}
