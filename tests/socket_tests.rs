// Integration tests for the session socket
//
// A scripted connector stands in for the server. Tests run on a paused clock
// so reconnect delays and keepalive intervals elapse instantly.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use interview_practice::transport::{
    MessageType, QuestionPayload, RealtimeChannel, RealtimeConnector, SessionSocket,
    SocketConfig, SocketEvent, SocketState,
};
use interview_practice::SocketError;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Server side of one accepted connection
struct ServerEnd {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl ServerEnd {
    fn send(&self, text: &str) {
        self.to_client.send(text.to_string()).unwrap();
    }

    async fn recv_json(&mut self) -> Option<Value> {
        let text = self.from_client.recv().await?;
        Some(serde_json::from_str(&text).unwrap())
    }
}

struct FakeChannel {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl RealtimeChannel for FakeChannel {
    async fn recv(&mut self) -> Option<Result<String, SocketError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn send(&mut self, text: String) -> Result<(), SocketError> {
        self.outbound
            .send(text)
            .map_err(|_| SocketError::Connection("peer gone".to_string()))
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// Accepts queued connections in order and refuses once the queue is empty
#[derive(Default)]
struct ScriptedConnector {
    accepts: Mutex<VecDeque<FakeChannel>>,
    dials: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedConnector {
    fn accept(&self) -> ServerEnd {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();
        self.accepts
            .lock()
            .unwrap()
            .push_back(FakeChannel { inbound, outbound });
        ServerEnd {
            to_client,
            from_client,
        }
    }

    fn dial_count(&self) -> usize {
        self.dials.lock().unwrap().len()
    }

    fn dial_times(&self) -> Vec<Instant> {
        self.dials.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl RealtimeConnector for ScriptedConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn RealtimeChannel>, SocketError> {
        self.dials
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));

        match self.accepts.lock().unwrap().pop_front() {
            Some(channel) => Ok(Box::new(channel)),
            None => Err(SocketError::Connection("connection refused".to_string())),
        }
    }
}

fn socket(connector: &Arc<ScriptedConnector>) -> (SessionSocket, mpsc::UnboundedReceiver<SocketEvent>) {
    let config = SocketConfig {
        ws_url: "ws://interview.test/".to_string(),
        ..SocketConfig::default()
    };
    SessionSocket::with_connector("session-1", config, connector.clone())
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SocketEvent>) -> SocketEvent {
    tokio::time::timeout(Duration::from_secs(600), events.recv())
        .await
        .expect("timed out waiting for a socket event")
        .expect("event stream ended")
}

#[tokio::test(start_paused = true)]
async fn test_connect_delivers_messages() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    assert!(socket.is_connected());
    assert_eq!(
        connector.dials.lock().unwrap()[0].0,
        "ws://interview.test/ws/interview/session-1"
    );

    server.send(r#"{"type":"question","data":{"question":"Tell me about a conflict","round":1,"total_rounds":3}}"#);

    let SocketEvent::Message(message) = next_event(&mut events).await else {
        panic!("expected a message event");
    };
    assert_eq!(message.kind(), MessageType::Question);
    let payload: QuestionPayload = message.payload().unwrap();
    assert_eq!(payload.question, "Tell me about a conflict");
    assert_eq!(payload.round, 1);
    assert_eq!(payload.total_rounds, 3);

    socket.disconnect().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frames_are_dropped() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    server.send("not json");
    server.send(r#"{"type":"unknown"}"#);
    server.send(r#"{"type":"ping"}"#);
    server.send(r#"{"type":"status","data":{"ai_state":"thinking"}}"#);

    let SocketEvent::Message(message) = next_event(&mut events).await else {
        panic!("expected a message event");
    };
    assert_eq!(message.kind(), MessageType::Status);
    assert!(socket.is_connected());

    socket.disconnect().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_send_answer_writes_frame() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let mut server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    socket.send_answer("I would listen first").await;

    let frame = server.recv_json().await.unwrap();
    assert_eq!(frame["type"], "answer");
    assert_eq!(frame["data"]["answer"], "I would listen first");

    socket.disconnect().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_send_answer_while_not_connected() {
    let connector = Arc::new(ScriptedConnector::default());
    let (socket, mut events) = socket(&connector);

    socket.send_answer("too early").await;

    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Error(SocketError::NotConnected)
    );
    assert_eq!(connector.dial_count(), 0);
    assert_eq!(socket.state(), SocketState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_reconnects_are_bounded() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    // Server goes away; every reconnect is refused
    drop(server);

    let delay = Duration::from_millis(1000);
    for attempt in 1..=3 {
        assert_eq!(
            next_event(&mut events).await,
            SocketEvent::Reconnecting { attempt, delay }
        );
        assert!(matches!(
            next_event(&mut events).await,
            SocketEvent::Error(SocketError::Connection(_))
        ));
    }
    assert_eq!(
        next_event(&mut events).await,
        SocketEvent::Closed(SocketError::ReconnectExhausted { attempts: 3 })
    );

    // Initial dial plus three reconnects, each after the fixed delay
    let dials = connector.dial_times();
    assert_eq!(dials.len(), 4);
    for pair in dials.windows(2).skip(1) {
        assert!(pair[1] - pair[0] >= delay);
    }

    // Terminal: nothing further happens
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(connector.dial_count(), 4);
    assert_eq!(socket.state(), SocketState::Closed);

    let err = socket.connect().await.unwrap_err();
    assert_eq!(err, SocketError::ReconnectExhausted { attempts: 3 });

    // Disconnect resets the socket so it can be used again
    socket.disconnect().await;
    assert_eq!(socket.state(), SocketState::Disconnected);
    let _server = connector.accept();
    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    socket.disconnect().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_successful_reconnect_resets_attempts() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let first = connector.accept();
    let second = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    drop(first);
    assert!(matches!(
        next_event(&mut events).await,
        SocketEvent::Reconnecting { attempt: 1, .. }
    ));
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    assert!(socket.is_connected());

    // A later drop starts counting from one again
    drop(second);
    assert!(matches!(
        next_event(&mut events).await,
        SocketEvent::Reconnecting { attempt: 1, .. }
    ));

    socket.disconnect().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_keepalive_pings_only_while_open() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let mut server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    let opened = Instant::now();
    let frame = server.recv_json().await.unwrap();
    assert_eq!(frame["type"], "ping");
    assert!(opened.elapsed() >= Duration::from_secs(30));

    let frame = server.recv_json().await.unwrap();
    assert_eq!(frame["type"], "ping");
    assert!(opened.elapsed() >= Duration::from_secs(60));

    socket.disconnect().await;

    // The channel is gone with the driver, so no ping can follow
    assert!(server.recv_json().await.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_stops_reconnection() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    socket.disconnect().await;
    assert_eq!(socket.state(), SocketState::Disconnected);
    drop(server);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(connector.dial_count(), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_reconnect_delay() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    drop(server);
    assert!(matches!(
        next_event(&mut events).await,
        SocketEvent::Reconnecting { attempt: 1, .. }
    ));

    socket.disconnect().await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(events.try_recv().is_err());
    assert_eq!(connector.dial_count(), 1);
    assert_eq!(socket.state(), SocketState::Disconnected);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_idempotent_while_open() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let _server = connector.accept();
    let (socket, mut events) = socket(&connector);

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);
    socket.connect().await?;

    assert_eq!(connector.dial_count(), 1);
    assert!(events.try_recv().is_err());

    socket.disconnect().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_zero_ping_interval_still_reconnects() -> Result<()> {
    let connector = Arc::new(ScriptedConnector::default());
    let server = connector.accept();
    let config = SocketConfig {
        ws_url: "ws://interview.test/".to_string(),
        ping_interval: Duration::ZERO,
        ..SocketConfig::default()
    };
    let (socket, mut events) = SessionSocket::with_connector("session-1", config, connector.clone());

    socket.connect().await?;
    assert_eq!(next_event(&mut events).await, SocketEvent::Connected);

    drop(server);

    // Pings racing the drop may fail to write first
    loop {
        match next_event(&mut events).await {
            SocketEvent::Error(SocketError::Connection(_)) => {}
            SocketEvent::Reconnecting { attempt, .. } => {
                assert_eq!(attempt, 1);
                break;
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(!socket.is_connected());

    socket.disconnect().await;
    Ok(())
}
