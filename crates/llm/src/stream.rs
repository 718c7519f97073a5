//! Reply Collection
//!
//! Drains a [`ChatReply`] into final text using the core stream reducer.

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use changeflow_core::streaming::{StreamAggregator, StreamControl};

use super::types::{ChatReply, LlmError, LlmResult};

/// Collect a chat reply into its final text.
///
/// Stream consumption stops at the first `error` event, or as soon as
/// `signal` is cancelled.
pub async fn collect_reply(reply: ChatReply, signal: Option<&CancellationToken>) -> LlmResult<String> {
    let mut stream = match reply {
        ChatReply::Message(message) => return Ok(message.content),
        ChatReply::Stream(stream) => stream,
    };

    let mut aggregator = StreamAggregator::new();
    loop {
        let next = match signal {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(LlmError::Cancelled),
                    event = stream.next() => event,
                }
            }
            None => stream.next().await,
        };

        let Some(event) = next else { break };
        if aggregator.push(event) == StreamControl::Abort {
            break;
        }
    }

    debug!(events = aggregator.event_count(), "Collected streamed reply");
    aggregator.finish().map_err(|e| LlmError::StreamFailed {
        message: match e {
            changeflow_core::CoreError::Stream(message) => message,
            other => other.to_string(),
        },
    })
}
