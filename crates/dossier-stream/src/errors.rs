//! Event-stream error types.
//!
//! None of these reach callers of the client's public operations; they
//! travel through `error`/`disconnected` events and logs instead.

use thiserror::Error;

/// Errors raised while building or opening a connection.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The configured base address cannot be turned into a WebSocket URL.
    #[error("invalid endpoint base {base:?}: expected http, https, ws or wss scheme")]
    InvalidEndpoint {
        /// The offending base address.
        base: String,
    },

    /// The transport could not be opened (DNS, TCP, TLS, or upgrade failure).
    #[error("failed to open event stream: {reason}")]
    Connect {
        /// Transport-specific failure text.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_endpoint_display() {
        let err = StreamError::InvalidEndpoint {
            base: "ftp://x".into(),
        };
        assert!(err.to_string().contains("\"ftp://x\""));
    }

    #[test]
    fn connect_display() {
        let err = StreamError::Connect {
            reason: "connection refused".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to open event stream: connection refused"
        );
    }
}
