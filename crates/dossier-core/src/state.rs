//! Connection lifecycle state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the event-stream connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting,
    /// Frames can be sent and received.
    Open,
    /// A close was requested and is in flight.
    Closing,
    /// No usable connection.
    #[default]
    Closed,
}

impl ReadyState {
    /// Upper-case name as reported to callers.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "CONNECTING",
            Self::Open => "OPEN",
            Self::Closing => "CLOSING",
            Self::Closed => "CLOSED",
        }
    }

    /// Whether a connection attempt or live connection exists.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
