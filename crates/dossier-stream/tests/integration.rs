//! End-to-end tests against a real WebSocket server on loopback.

use std::time::Duration;

use dossier_core::{AuthToken, ReconnectPolicy, ServerEvent, SessionId};
use dossier_stream::events::names;
use dossier_stream::{ClientConfig, EventStreamClient, Listener, StreamEvent};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

const TIMEOUT: Duration = Duration::from_secs(5);

type ServerWs = WebSocketStream<TcpStream>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/api", listener.local_addr().unwrap());
    (listener, base)
}

/// Accept one connection and return it with the request path and query.
async fn accept(listener: &TcpListener) -> (ServerWs, String) {
    let (tcp, _) = listener.accept().await.unwrap();
    let mut uri = String::new();
    let ws = accept_hdr_async(
        tcp,
        |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            uri = req.uri().to_string();
            Ok(resp)
        },
    )
    .await
    .unwrap();
    (ws, uri)
}

/// Greeting the backend sends right after accepting a customer channel.
async fn greet(ws: &mut ServerWs, customer_id: &str) {
    let greeting = json!({
        "type": "connected",
        "message": format!("Connected to customer {customer_id}"),
        "customer_id": customer_id,
        "connection_count": 1,
    });
    ws.send(Message::Text(greeting.to_string().into()))
        .await
        .unwrap();
}

async fn close_with(ws: &mut ServerWs, code: CloseCode, reason: &str) {
    ws.close(Some(CloseFrame {
        code,
        reason: reason.to_owned().into(),
    }))
    .await
    .unwrap();
    while ws.next().await.is_some() {}
}

fn client(base_url: String, max_attempts: u32, delay_ms: u64) -> EventStreamClient {
    EventStreamClient::new(ClientConfig {
        base_url,
        reconnect: ReconnectPolicy::new(max_attempts, delay_ms),
    })
}

fn sid(s: &str) -> SessionId {
    SessionId::new(s).unwrap()
}

async fn next(rx: &mut mpsc::UnboundedReceiver<StreamEvent>) -> StreamEvent {
    timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("listener channel closed")
}

/// One listener handle registered under every lifecycle key.
fn lifecycle_recorder(client: &EventStreamClient) -> mpsc::UnboundedReceiver<StreamEvent> {
    let (listener, rx) = Listener::channel();
    for key in [
        names::CONNECTED,
        names::ERROR,
        names::DISCONNECTED,
        names::MAX_RECONNECT_ATTEMPTS,
    ] {
        client.on(key, &listener);
    }
    rx
}

#[tokio::test]
async fn greeting_and_relay_round_trip() {
    let (listener, base) = bind().await;
    let server = tokio::spawn(async move {
        let (mut ws, uri) = accept(&listener).await;
        greet(&mut ws, "c1").await;
        let Some(Ok(Message::Text(text))) = ws.next().await else {
            panic!("expected a text frame from the client");
        };
        let sent: Value = serde_json::from_str(text.as_str()).unwrap();
        let relay = json!({"type": "message", "data": sent, "customer_id": "c1"});
        ws.send(Message::Text(relay.to_string().into()))
            .await
            .unwrap();
        close_with(&mut ws, CloseCode::Normal, "").await;
        uri
    });

    let client = client(base, 0, 50);
    let (_connected, mut connected) = client.subscribe(names::CONNECTED);
    let (_all, mut all) = client.subscribe(names::MESSAGE);
    client.connect(sid("c1"), AuthToken::new("tok-1"));

    // lifecycle event first, then the server's own `connected` frame
    assert_eq!(
        next(&mut connected).await,
        StreamEvent::Connected { session_id: sid("c1") }
    );
    let greeting = next(&mut connected).await;
    let frame = greeting.frame().expect("greeting frame");
    assert!(matches!(
        frame.event(),
        ServerEvent::Connected { connection_count: Some(1), .. }
    ));
    assert_eq!(next(&mut all).await, greeting);
    assert!(client.is_connected());

    assert!(client.send("ping", json!({"n": 1})));

    // a `message`-typed frame hits the `message` key twice
    let relay = next(&mut all).await;
    assert_eq!(next(&mut all).await, relay);
    assert!(matches!(
        relay.frame().unwrap().event(),
        ServerEvent::Relay { data, .. } if *data == json!({"type": "ping", "data": {"n": 1}})
    ));

    let uri = timeout(TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(uri, "/api/ws/c1?token=tok-1");
    client.disconnect();
}

#[tokio::test]
async fn server_close_triggers_reconnect() {
    let (listener, base) = bind().await;
    let server = tokio::spawn(async move {
        let (mut first, _) = accept(&listener).await;
        close_with(&mut first, CloseCode::Normal, "bye").await;
        let (mut second, uri) = accept(&listener).await;
        greet(&mut second, "c2").await;
        (second, uri)
    });

    let client = client(base, 3, 50);
    let mut events = lifecycle_recorder(&client);
    client.connect(sid("c2"), AuthToken::new("t"));

    assert!(matches!(next(&mut events).await, StreamEvent::Connected { .. }));
    assert_eq!(
        next(&mut events).await,
        StreamEvent::Disconnected {
            code: 1000,
            reason: "bye".into()
        }
    );
    assert!(matches!(next(&mut events).await, StreamEvent::Connected { .. }));
    assert_eq!(client.reconnect_attempts(), 0);

    let (_second, uri) = timeout(TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(uri, "/api/ws/c2?token=t");
    client.disconnect();
}

#[tokio::test]
async fn policy_violation_close_is_reported() {
    let (listener, base) = bind().await;
    let server = tokio::spawn(async move {
        let (mut ws, uri) = accept(&listener).await;
        if uri.ends_with("token=") {
            close_with(&mut ws, CloseCode::Policy, "Missing token").await;
        }
    });

    let client = client(base, 0, 50);
    let mut events = lifecycle_recorder(&client);
    client.connect(sid("c3"), AuthToken::new(""));

    assert!(matches!(next(&mut events).await, StreamEvent::Connected { .. }));
    assert_eq!(
        next(&mut events).await,
        StreamEvent::Disconnected {
            code: 1008,
            reason: "Missing token".into()
        }
    );
    assert_eq!(
        next(&mut events).await,
        StreamEvent::MaxReconnectAttempts { attempts: 0 }
    );
    timeout(TIMEOUT, server).await.unwrap().unwrap();
}

#[tokio::test]
async fn unreachable_server_exhausts_attempts() {
    let (listener, base) = bind().await;
    drop(listener);

    let client = client(base, 1, 20);
    let mut events = lifecycle_recorder(&client);
    client.connect(sid("c4"), AuthToken::new("t"));

    for _ in 0..2 {
        assert!(matches!(next(&mut events).await, StreamEvent::Error { .. }));
        assert!(matches!(
            next(&mut events).await,
            StreamEvent::Disconnected { code: 1006, .. }
        ));
    }
    assert_eq!(
        next(&mut events).await,
        StreamEvent::MaxReconnectAttempts { attempts: 1 }
    );
    assert!(!client.is_connected());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(events.try_recv().is_err());
}
