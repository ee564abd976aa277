//! Endpoint address construction.

use dossier_core::{AuthToken, SessionId};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::errors::StreamError;

/// RFC 3986 unreserved characters pass through; everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Map an API base address to its WebSocket equivalent.
///
/// `http` becomes `ws`, `https` becomes `wss`; `ws`/`wss` pass through.
/// A trailing slash is dropped.
pub fn websocket_base(base: &str) -> Result<String, StreamError> {
    let trimmed = base.trim().trim_end_matches('/');
    let mapped = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        trimmed.to_owned()
    } else {
        return Err(StreamError::InvalidEndpoint {
            base: base.to_owned(),
        });
    };
    Ok(mapped)
}

/// Build `{ws base}/ws/{session}?token={token}`.
pub fn endpoint_url(
    base: &str,
    session_id: &SessionId,
    token: &AuthToken,
) -> Result<String, StreamError> {
    let ws_base = websocket_base(base)?;
    Ok(format!(
        "{ws_base}/ws/{}?token={}",
        utf8_percent_encode(session_id.as_str(), UNRESERVED),
        utf8_percent_encode(token.expose(), UNRESERVED),
    ))
}

/// Replace the token query value so the URL can be logged.
pub fn redact_token(url: &str) -> String {
    match url.split_once("?token=") {
        Some((head, _)) => format!("{head}?token=***"),
        None => url.to_owned(),
    }
}
