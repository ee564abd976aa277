//! Events delivered to listeners.
//!
//! Lifecycle events (`connected`, `error`, `disconnected`,
//! `max_reconnect_attempts`) and inbound frames share one listener
//! mechanism. A frame is dispatched under its own `type` and then under
//! [`names::MESSAGE`].

use dossier_core::{InboundFrame, SessionId};

/// Well-known listener keys.
pub mod names {
    /// Transport reported open.
    pub const CONNECTED: &str = "connected";
    /// Every decoded inbound frame.
    pub const MESSAGE: &str = "message";
    /// Transport-level error notification.
    pub const ERROR: &str = "error";
    /// Transport closed.
    pub const DISCONNECTED: &str = "disconnected";
    /// Reconnect ceiling reached.
    pub const MAX_RECONNECT_ATTEMPTS: &str = "max_reconnect_attempts";
}

/// Close code reported when the transport ends without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Close code reported when a close frame carried no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Payload handed to a listener.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// The connection opened.
    Connected {
        /// Session the connection is bound to.
        session_id: SessionId,
    },
    /// A decoded inbound frame.
    Frame(InboundFrame),
    /// The transport reported an error. Not fatal by itself.
    Error {
        /// Transport error text.
        message: String,
    },
    /// The transport closed.
    Disconnected {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
    /// Reconnecting gave up for this disconnect episode.
    MaxReconnectAttempts {
        /// Attempts made before giving up.
        attempts: u32,
    },
}

impl StreamEvent {
    /// Listener key for lifecycle events; `None` for frames, which are keyed
    /// by their own `type` and by [`names::MESSAGE`].
    #[must_use]
    pub fn lifecycle_name(&self) -> Option<&'static str> {
        match self {
            Self::Connected { .. } => Some(names::CONNECTED),
            Self::Frame(_) => None,
            Self::Error { .. } => Some(names::ERROR),
            Self::Disconnected { .. } => Some(names::DISCONNECTED),
            Self::MaxReconnectAttempts { .. } => Some(names::MAX_RECONNECT_ATTEMPTS),
        }
    }

    /// The inbound frame, if this event carries one.
    #[must_use]
    pub fn frame(&self) -> Option<&InboundFrame> {
        match self {
            Self::Frame(frame) => Some(frame),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_names() {
        let connected = StreamEvent::Connected {
            session_id: SessionId::new("c1").unwrap(),
        };
        assert_eq!(connected.lifecycle_name(), Some("connected"));
        assert_eq!(
            StreamEvent::MaxReconnectAttempts { attempts: 5 }.lifecycle_name(),
            Some("max_reconnect_attempts")
        );
        let frame = StreamEvent::Frame(InboundFrame::decode(r#"{"type":"x"}"#).unwrap());
        assert_eq!(frame.lifecycle_name(), None);
        assert!(frame.frame().is_some());
    }
}
