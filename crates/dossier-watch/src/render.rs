//! Terminal rendering of stream events.

use dossier_stream::StreamEvent;

/// Raw JSON of an inbound frame, one line.
pub fn frame_line(event: &StreamEvent) -> Option<String> {
    event.frame().map(|frame| frame.raw().to_string())
}

/// Human-readable status for lifecycle events. Frames render as `None`;
/// they go through [`frame_line`].
pub fn status_line(event: &StreamEvent) -> Option<String> {
    let line = match event {
        StreamEvent::Frame(_) => return None,
        StreamEvent::Connected { session_id } => format!("connected to {session_id}"),
        StreamEvent::Error { message } => format!("error: {message}"),
        StreamEvent::Disconnected { code, reason } if reason.is_empty() => {
            format!("disconnected (code {code})")
        }
        StreamEvent::Disconnected { code, reason } => {
            format!("disconnected (code {code}): {reason}")
        }
        StreamEvent::MaxReconnectAttempts { attempts } => {
            format!("giving up after {attempts} reconnect attempts")
        }
    };
    Some(line)
}
