//! # dossier-core
//!
//! Shared vocabulary for the dossier customer event stream.
//!
//! - **Identifiers**: [`SessionId`] (non-empty customer channel id) and
//!   [`AuthToken`] (bearer credential with redacted `Debug`)
//! - **Frames**: [`InboundFrame`] / [`ServerEvent`] decoded at the wire
//!   boundary, [`OutboundFrame`] for client-to-server messages
//! - **Connection state**: [`ReadyState`]
//! - **Backoff**: [`ReconnectPolicy`] and linear delay math
//! - **Errors**: [`CoreError`] via `thiserror`
//! - **Logging**: `tracing` subscriber setup and in-memory capture for tests

#![deny(unsafe_code)]

pub mod backoff;
pub mod errors;
pub mod frames;
pub mod ids;
pub mod logging;
pub mod state;

pub use backoff::{ReconnectPolicy, linear_backoff_delay};
pub use errors::CoreError;
pub use frames::{InboundFrame, OutboundFrame, ServerEvent};
pub use ids::{AuthToken, SessionId};
pub use state::ReadyState;
