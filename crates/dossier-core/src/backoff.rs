//! Reconnect policy and backoff calculation.
//!
//! The event stream retries with *linear* backoff: attempt `n` (1-based)
//! waits `base_delay × n`. There is no jitter and no cap other than the
//! attempt ceiling, which bounds the longest wait at
//! `base_delay × max_attempts`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default reconnect ceiling per disconnect episode.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Default base delay in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Linear backoff delay for a 1-based attempt number.
///
/// Attempt 0 yields zero; callers never schedule it.
#[must_use]
pub fn linear_backoff_delay(attempt: u32, base_delay_ms: u64) -> u64 {
    base_delay_ms.saturating_mul(u64::from(attempt))
}

/// Retry parameters for the event-stream client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectPolicy {
    /// Maximum reconnect attempts before giving up (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay in ms (default: 3000).
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_RECONNECT_DELAY_MS
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            base_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
        }
    }
}

impl ReconnectPolicy {
    /// Create a policy with explicit values.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            base_delay_ms,
        }
    }

    /// Whether another attempt may be scheduled after `attempts_made`.
    #[must_use]
    pub fn allows(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay before the given 1-based attempt.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(linear_backoff_delay(attempt, self.base_delay_ms))
    }
}
