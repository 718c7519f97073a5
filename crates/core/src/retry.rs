//! Retry Policy
//!
//! One value object describing bounded sequential retry with a fixed delay,
//! applied uniformly to every backend kind.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Bounded sequential retry with a fixed inter-attempt delay (no backoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts including the first one
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Delay between attempts in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_attempts() -> u32 {
    2
}

fn default_delay_ms() -> u64 {
    750
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay_ms: u64) -> Self {
        Self { attempts, delay_ms }
    }

    /// Single attempt, no delay.
    pub fn once() -> Self {
        Self::new(1, 0)
    }

    /// Attempt count, never below one.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Whether another attempt follows `attempt` (1-based).
    pub fn has_next(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.attempts == 0 {
            return Err(CoreError::validation("retry attempts must be at least 1"));
        }
        Ok(())
    }
}
