//! Transport seam between the client state machine and the socket.
//!
//! A [`Connector`] opens a [`Link`]: an outbound command channel and an
//! inbound event channel. The client never touches the socket directly,
//! which lets tests drive the state machine with an in-memory connector.
//!
//! [`WsConnector`] is the `tokio-tungstenite` implementation. Each link gets
//! a pump task that writes outbound text, forwards inbound text, and always
//! finishes with exactly one [`TransportEvent::Closed`].

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

use crate::errors::StreamError;
use crate::events::{ABNORMAL_CLOSURE, NO_STATUS_RECEIVED};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a requested close waits for the peer's close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Command sent from the client to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    /// Send one text frame.
    Text(String),
    /// Start the close handshake.
    Close,
}

/// Notification sent from the transport to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// One inbound text frame.
    Text(String),
    /// A transport-level error. The connection may or may not close after.
    Error(String),
    /// The peer started the close handshake.
    Closing,
    /// The connection is gone. Always the last event on a link.
    Closed {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
}

/// Channels of one open connection.
#[derive(Debug)]
pub struct Link {
    /// Commands to the transport.
    pub outbound: mpsc::UnboundedSender<Outgoing>,
    /// Events from the transport.
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens connections to an endpoint URL.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a connection. Resolves once the handshake completed.
    async fn open(&self, url: &str) -> Result<Link, StreamError>;
}

/// WebSocket connector backed by `tokio-tungstenite`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> Result<Link, StreamError> {
        let (ws, response) = connect_async(url)
            .await
            .map_err(|e| StreamError::Connect {
                reason: e.to_string(),
            })?;
        debug!(status = response.status().as_u16(), "websocket handshake complete");

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let _pump = tokio::spawn(pump(ws, out_rx, in_tx, CLOSE_HANDSHAKE_TIMEOUT));

        Ok(Link {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// Shuttle frames between the socket and the link channels.
///
/// Once a close is requested the peer has `close_timeout` to answer before
/// the socket is dropped.
async fn pump(
    ws: WsStream,
    mut outbound: mpsc::UnboundedReceiver<Outgoing>,
    inbound: mpsc::UnboundedSender<TransportEvent>,
    close_timeout: Duration,
) {
    let (mut sink, mut stream) = ws.split();
    let mut close: Option<(u16, String)> = None;
    let mut accepting_commands = true;
    let close_deadline = tokio::time::sleep(close_timeout);
    tokio::pin!(close_deadline);

    loop {
        tokio::select! {
            cmd = outbound.recv(), if accepting_commands => match cmd {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        let _ = inbound.send(TransportEvent::Error(e.to_string()));
                    }
                }
                Some(Outgoing::Close) | None => {
                    accepting_commands = false;
                    close_deadline.as_mut().reset(Instant::now() + close_timeout);
                    let _ = sink.send(Message::Close(None)).await;
                    // nobody is listening for the handshake result
                    if inbound.is_closed() {
                        break;
                    }
                }
            },
            () = &mut close_deadline, if !accepting_commands => {
                debug!("peer did not answer close handshake");
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let forwarded = inbound.send(TransportEvent::Text(text.as_str().to_owned()));
                    if forwarded.is_err() && !accepting_commands {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    close = Some(frame.map_or((NO_STATUS_RECEIVED, String::new()), |f| {
                        (u16::from(f.code), f.reason.as_str().to_owned())
                    }));
                    let _ = inbound.send(TransportEvent::Closing);
                }
                Some(Ok(other)) => {
                    trace!(kind = ?message_kind(&other), "ignoring non-text frame");
                }
                Some(Err(e)) => {
                    if close.is_none() {
                        let _ = inbound.send(TransportEvent::Error(e.to_string()));
                    }
                    break;
                }
                None => break,
            },
        }
    }

    let (code, reason) = close.unwrap_or((ABNORMAL_CLOSURE, String::new()));
    let _ = inbound.send(TransportEvent::Closed { code, reason });
}

fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}
