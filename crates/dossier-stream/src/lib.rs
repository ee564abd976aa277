//! # dossier-stream
//!
//! Reconnecting event-stream client for a customer's document channel.
//!
//! [`EventStreamClient`] keeps one WebSocket open to
//! `{ws base}/ws/{session}?token={token}`, decodes inbound JSON frames, and
//! fans them out to [`Listener`]s registered per event type. Unexpected
//! closes are retried with linear backoff up to a ceiling; see
//! [`dossier_core::ReconnectPolicy`].
//!
//! The transport sits behind the [`Connector`] trait so the state machine can
//! be driven without a network. [`WsConnector`] is the `tokio-tungstenite`
//! implementation used in production.
//!
//! All client methods are synchronous and must be called from within a
//! Tokio runtime; connection work runs on spawned tasks.

#![deny(unsafe_code)]

pub mod client;
pub mod endpoint;
pub mod errors;
pub mod events;
pub mod registry;
pub mod transport;

pub use client::{ClientConfig, EventStreamClient};
pub use endpoint::{endpoint_url, websocket_base};
pub use errors::StreamError;
pub use events::StreamEvent;
pub use registry::{Listener, ListenerRegistry};
pub use transport::{Connector, Link, Outgoing, TransportEvent, WsConnector};
