//! End-to-end notification scenario against an in-memory transport:
//! connect, observe a notification, lose the connection, reconnect with
//! automatic resubscription, observe a second notification.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time;

use deskrelay_client::{ClientConfig, ConnectionManager, ConnectionState, NotificationObserver};
use deskrelay_core::frame::{Command, Frame};
use deskrelay_core::message::Notification;
use deskrelay_core::transport::{StaticToken, Transport, TransportEvent, TransportSession};
use deskrelay_core::ClientError;

struct MockTransport {
    sessions: Mutex<VecDeque<TransportSession>>,
    opens: AtomicUsize,
}

struct SessionHarness {
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<TransportEvent>,
}

impl MockTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(VecDeque::new()),
            opens: AtomicUsize::new(0),
        })
    }

    fn push_session(&self) -> SessionHarness {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (ev_tx, ev_rx) = mpsc::unbounded_channel();
        self.sessions.lock().unwrap().push_back(TransportSession {
            outgoing: out_tx,
            incoming: ev_rx,
        });
        SessionHarness { from_client: out_rx, to_client: ev_tx }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(
        &self,
        _url: &str,
        _headers: &[(String, String)],
    ) -> Result<TransportSession, ClientError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::Transport("connection refused".into()))
    }
}

impl SessionHarness {
    async fn expect(&mut self, command: Command) -> Frame {
        loop {
            let raw = self.from_client.recv().await.expect("client closed session");
            if Frame::is_heartbeat(&raw) {
                continue;
            }
            let frame = Frame::parse(&raw).expect("client sent malformed frame");
            assert_eq!(frame.command, command, "unexpected frame: {frame:?}");
            return frame;
        }
    }

    fn accept(&self) {
        let frame = Frame::new(Command::Connected).header("version", "1.1");
        self.to_client
            .send(TransportEvent::Frame(frame.encode()))
            .unwrap();
    }

    fn deliver(&self, destination: &str, body: &str) {
        let frame = Frame::new(Command::Message)
            .header("destination", destination)
            .body(body);
        let _ = self.to_client.send(TransportEvent::Frame(frame.encode()));
    }

    fn close_abnormally(&self) {
        let _ = self.to_client.send(TransportEvent::Closed {
            code: Some(1006),
            reason: "going away".into(),
        });
    }
}

struct RecordingObserver {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self { seen: Mutex::new(Vec::new()) })
    }
}

impl NotificationObserver for RecordingObserver {
    fn on_notification(&self, notification: &Notification) {
        self.seen.lock().unwrap().push(notification.clone());
    }
}

#[tokio::test(start_paused = true)]
async fn notifications_survive_a_reconnect_cycle() {
    let transport = MockTransport::new();
    let mut first = transport.push_session();
    let manager = ConnectionManager::new(
        transport.clone(),
        Arc::new(StaticToken::new("jwt")),
        ClientConfig::new("wss://helpdesk.test/ws"),
    );

    // Connect.
    let m = manager.clone();
    let connect = tokio::spawn(async move {
        m.connect(Arc::new(|| {}), Arc::new(|_| {})).await
    });
    first.expect(Command::Connect).await;
    first.accept();
    connect.await.unwrap().unwrap();
    assert_eq!(manager.state(), ConnectionState::Connected);

    // Observe /topic/notifications.
    let observer = RecordingObserver::new();
    assert!(manager.add_observer(observer.clone()));
    manager
        .subscribe("/topic/notifications", Arc::new(|_| {}))
        .unwrap();
    let sub = first.expect(Command::Subscribe).await;
    assert_eq!(sub.destination(), Some("/topic/notifications"));

    // First notification.
    first.deliver("/topic/notifications", r#"{"type":"NEW_TICKET","id":42}"#);
    time::sleep(Duration::from_millis(1)).await;
    {
        let seen = observer.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind.as_deref(), Some("NEW_TICKET"));
        assert_eq!(seen[0].id, Some(42));
    }

    // Abnormal close → disconnected, reconnect timer of ~1000ms.
    let mut second = transport.push_session();
    let lost_at = time::Instant::now();
    first.close_abnormally();
    time::sleep(Duration::from_millis(1)).await;
    assert_eq!(manager.state(), ConnectionState::Disconnected);

    // Scheduler fires; the new session is handshaken and the subscription
    // replayed without any caller involvement.
    second.expect(Command::Connect).await;
    assert!(lost_at.elapsed() >= Duration::from_millis(1_000));
    second.accept();
    let replay = second.expect(Command::Subscribe).await;
    assert_eq!(replay.destination(), Some("/topic/notifications"));

    // Second notification, same observer.
    second.deliver("/topic/notifications", r#"{"type":"NEW_TICKET","id":43}"#);
    time::sleep(Duration::from_millis(1)).await;
    {
        let seen = observer.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].id, Some(43));
    }
    assert_eq!(manager.state(), ConnectionState::Connected);
    assert_eq!(transport.opens.load(Ordering::SeqCst), 2);
}
