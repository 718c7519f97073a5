//! Stream Event Types
//!
//! Closed tagged-union of the events a local model runtime emits while
//! streaming a reply, plus the pure reducer that folds them into final text.
//!
//! Aggregation rules:
//! - `chunk` deltas are concatenated in arrival order
//! - the last non-empty `result` message replaces the aggregate
//! - an `error` event aborts aggregation immediately

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A single event emitted by a streamed chat reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental text delta
    Chunk { delta: String },
    /// Complete message reported by the runtime
    Result { message: String },
    /// Runtime-side failure
    Error { message: String },
}

impl StreamEvent {
    pub fn chunk(delta: impl Into<String>) -> Self {
        Self::Chunk {
            delta: delta.into(),
        }
    }

    pub fn result(message: impl Into<String>) -> Self {
        Self::Result {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// What the reducer wants the consumer to do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    Continue,
    Abort,
}

/// Pure reducer over a sequence of [`StreamEvent`]s.
///
/// Transport-independent: callers feed events from whatever channel or
/// iterator they hold and call [`StreamAggregator::finish`] at the end.
#[derive(Debug, Default, Clone)]
pub struct StreamAggregator {
    text: String,
    result: Option<String>,
    error: Option<String>,
    events: usize,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event. Once an error has been seen every later event is ignored.
    pub fn push(&mut self, event: StreamEvent) -> StreamControl {
        if self.error.is_some() {
            return StreamControl::Abort;
        }
        self.events += 1;
        match event {
            StreamEvent::Chunk { delta } => {
                self.text.push_str(&delta);
                StreamControl::Continue
            }
            StreamEvent::Result { message } => {
                if !message.trim().is_empty() {
                    self.result = Some(message);
                }
                StreamControl::Continue
            }
            StreamEvent::Error { message } => {
                self.error = Some(message);
                StreamControl::Abort
            }
        }
    }

    /// Number of events applied so far.
    pub fn event_count(&self) -> usize {
        self.events
    }

    /// Whether an error event aborted the stream.
    pub fn is_aborted(&self) -> bool {
        self.error.is_some()
    }

    /// Finish aggregation, yielding the final text or the stream error.
    pub fn finish(self) -> CoreResult<String> {
        if let Some(message) = self.error {
            return Err(CoreError::stream(message));
        }
        Ok(self.result.unwrap_or(self.text))
    }

    /// Reduce a complete in-memory sequence.
    pub fn reduce<I>(events: I) -> CoreResult<String>
    where
        I: IntoIterator<Item = StreamEvent>,
    {
        let mut aggregator = Self::new();
        for event in events {
            if aggregator.push(event) == StreamControl::Abort {
                break;
            }
        }
        aggregator.finish()
    }
}
