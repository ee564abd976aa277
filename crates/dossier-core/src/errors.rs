//! Core error types.

use thiserror::Error;

/// Errors raised while building identifiers or decoding frames.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A session id was empty or whitespace only.
    #[error("session id must not be empty")]
    EmptySessionId,

    /// Inbound text was not valid JSON.
    #[error("frame is not valid JSON: {0}")]
    FrameJson(#[from] serde_json::Error),

    /// Inbound JSON was valid but not an object.
    #[error("frame is not a JSON object (got {found})")]
    FrameNotObject {
        /// JSON kind that was received instead.
        found: &'static str,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
