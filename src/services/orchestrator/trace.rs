//! Analysis Trace Buffer
//!
//! Per-run ordered buffer of trace events, flushed once to an optional sink.

use std::sync::{Arc, Mutex};

use crate::models::trace::{TraceEvent, TraceKind};

/// Callback receiving the trace of a finished run.
pub type TraceSink = Arc<dyn Fn(&[TraceEvent]) + Send + Sync>;

/// Shared, append-only trace buffer for one analysis run.
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl TraceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &self,
        kind: TraceKind,
        agent_id: &str,
        attempt: Option<u32>,
        message: impl Into<String>,
    ) {
        let event = TraceEvent {
            kind,
            agent_id: agent_id.to_string(),
            attempt,
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the events recorded so far.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Drain the buffer, handing the events to `sink` when one is set.
    pub fn flush(&self, sink: Option<&TraceSink>) -> Vec<TraceEvent> {
        let drained = {
            let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *events)
        };
        if let Some(sink) = sink {
            sink(&drained);
        }
        drained
    }
}
