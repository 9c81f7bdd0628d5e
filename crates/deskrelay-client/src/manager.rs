//! Connection orchestration.
//!
//! `ConnectionManager` owns the transport handle and drives the lifecycle
//! state machine: connect handshake, heartbeat, subscription replay,
//! backoff-scheduled reconnect, and teardown. One manager per logical
//! session — construct it with an injected transport and credential
//! provider; it is cheap to clone and safe to share across tasks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;

use deskrelay_core::error::ClientError;
use deskrelay_core::frame::{Command, Frame};
use deskrelay_core::policy::{BackoffConfig, BackoffPolicy};
use deskrelay_core::transport::{
    CredentialProvider, Transport, TransportEvent, TransportSession, NORMAL_CLOSE_CODE,
};

use crate::dispatch::{MessageDispatcher, NotificationObserver};
use crate::heartbeat::run_heartbeat;
use crate::registry::{MessageHandler, SubscriptionRegistry};
use crate::state::ConnectionState;

/// Configuration for `ConnectionManager`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Broker WebSocket URL.
    pub url: String,
    /// Reconnect backoff policy.
    pub backoff: BackoffConfig,
    /// Period between outgoing heartbeat frames.
    pub heartbeat_interval: Duration,
    /// Upper bound on the whole connect handshake (transport open through
    /// the broker's CONNECTED frame).
    pub handshake_timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff: BackoffConfig::default(),
            heartbeat_interval: Duration::from_secs(10),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

/// Invoked after every successful (re)connect, once resubscription is done.
pub type ConnectedCallback = Arc<dyn Fn() + Send + Sync>;
/// Invoked on connect failure and abnormal close.
pub type ErrorCallback = Arc<dyn Fn(&ClientError) + Send + Sync>;

struct ManagerInner {
    state: ConnectionState,
    /// Consecutive failed connect attempts; resets on success.
    attempt: u32,
    /// Session generation. Bumped on every install and teardown; events
    /// carrying a stale generation are dropped, which is what makes
    /// `disconnect()` final even with frames still in flight.
    generation: u64,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    /// Cancels the live session's heartbeat and reader, or a pending
    /// reconnect timer. At most one of those exists at a time.
    cancel: Option<CancellationToken>,
    on_connected: Option<ConnectedCallback>,
    on_error: Option<ErrorCallback>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn CredentialProvider>,
    config: ClientConfig,
    backoff: BackoffPolicy,
    registry: SubscriptionRegistry,
    dispatcher: MessageDispatcher,
    inner: Mutex<ManagerInner>,
}

/// The realtime connection manager.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialProvider>,
        config: ClientConfig,
    ) -> Self {
        let backoff = BackoffPolicy::new(config.backoff.clone());
        Self {
            shared: Arc::new(Shared {
                transport,
                credentials,
                config,
                backoff,
                registry: SubscriptionRegistry::new(),
                dispatcher: MessageDispatcher::new(),
                inner: Mutex::new(ManagerInner {
                    state: ConnectionState::Disconnected,
                    attempt: 0,
                    generation: 0,
                    outgoing: None,
                    cancel: None,
                    on_connected: None,
                    on_error: None,
                }),
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().unwrap().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Number of registered subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.shared.registry.len()
    }

    // ─── Connect / disconnect ────────────────────────────────────────────

    /// Establish the connection.
    ///
    /// Suspends until the handshake completes or fails. A missing credential
    /// fails immediately with [`ClientError::AuthenticationMissing`] and is
    /// never retried; transport failures schedule a backoff reconnect.
    /// Calling this while a connect attempt is already in flight (or while
    /// connected) is a success no-op.
    pub async fn connect(
        &self,
        on_connected: ConnectedCallback,
        on_error: ErrorCallback,
    ) -> Result<(), ClientError> {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.state.is_transitioning() || inner.state == ConnectionState::Connected {
                return Ok(());
            }
            inner.state = ConnectionState::Connecting;
            inner.on_connected = Some(on_connected);
            inner.on_error = Some(on_error);
        }
        self.establish().await
    }

    /// Tear the session down.
    ///
    /// Unsubscribes every registry entry (best-effort), closes the
    /// transport, cancels the heartbeat and any pending reconnect timer,
    /// and clears the registry. Terminal for the session: no handler or
    /// observer fires after this returns. Idempotent.
    pub fn disconnect(&self) {
        let mut inner = self.shared.inner.lock().unwrap();
        if let Some(out) = inner.outgoing.take() {
            // Transport errors during teardown are swallowed.
            for (_, id, _) in self.shared.registry.snapshot() {
                let _ = out.send(Frame::unsubscribe(&id).encode());
            }
            let _ = out.send(Frame::disconnect().encode());
        }
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        self.shared.registry.clear();
        inner.generation += 1;
        inner.attempt = 0;
        inner.state = ConnectionState::Disconnected;
        inner.on_connected = None;
        inner.on_error = None;
        tracing::info!("disconnected");
    }

    // ─── Messaging ───────────────────────────────────────────────────────

    /// Subscribe `handler` to `destination`.
    ///
    /// Idempotent: subscribing an already-subscribed destination is a
    /// success no-op and the original handler stays in place. Fails with
    /// [`ClientError::NotConnected`] when the connection is not up — there
    /// is no deferred subscription.
    pub fn subscribe(
        &self,
        destination: &str,
        handler: MessageHandler,
    ) -> Result<(), ClientError> {
        self.subscribe_with_headers(destination, handler, HashMap::new())
    }

    pub fn subscribe_with_headers(
        &self,
        destination: &str,
        handler: MessageHandler,
        headers: HashMap<String, String>,
    ) -> Result<(), ClientError> {
        let inner = self.shared.inner.lock().unwrap();
        if inner.state != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let Some(out) = inner.outgoing.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        let Some(id) = self.shared.registry.insert(destination, handler, headers.clone()) else {
            return Ok(());
        };
        let mut frame = Frame::subscribe(&id, destination);
        for (name, value) in headers {
            frame = frame.header(name, value);
        }
        out.send(frame.encode())
            .map_err(|_| ClientError::Transport("session closed".into()))?;
        tracing::debug!(destination = %destination, id = %id, "subscribed");
        Ok(())
    }

    /// Remove the subscription for `destination`.
    ///
    /// Returns `false` if no such subscription existed.
    pub fn unsubscribe(&self, destination: &str) -> bool {
        let inner = self.shared.inner.lock().unwrap();
        let Some(id) = self.shared.registry.remove(destination) else {
            return false;
        };
        if inner.state == ConnectionState::Connected {
            if let Some(out) = inner.outgoing.as_ref() {
                let _ = out.send(Frame::unsubscribe(&id).encode());
            }
        }
        tracing::debug!(destination = %destination, "unsubscribed");
        true
    }

    /// Send `payload` as a JSON SEND frame to `destination`.
    ///
    /// Only valid while connected; fails softly with
    /// [`ClientError::NotConnected`] otherwise so callers can fall back to
    /// another channel. Success means the frame was handed to the transport,
    /// not that it was delivered.
    pub fn send<T: Serialize>(&self, destination: &str, payload: &T) -> Result<(), ClientError> {
        let body = serde_json::to_string(payload)?;
        let inner = self.shared.inner.lock().unwrap();
        if inner.state != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let Some(out) = inner.outgoing.as_ref() else {
            return Err(ClientError::NotConnected);
        };
        out.send(Frame::send(destination, body).encode())
            .map_err(|_| ClientError::Transport("session closed".into()))
    }

    /// Register a notification observer. Returns `false` on duplicate.
    pub fn add_observer(&self, observer: Arc<dyn NotificationObserver>) -> bool {
        self.shared.dispatcher.add_observer(observer)
    }

    /// Remove a notification observer. Returns `false` if not registered.
    pub fn remove_observer(&self, observer: &Arc<dyn NotificationObserver>) -> bool {
        self.shared.dispatcher.remove_observer(observer)
    }

    // ─── Session lifecycle ───────────────────────────────────────────────

    async fn establish(&self) -> Result<(), ClientError> {
        match self.try_handshake().await {
            Ok(session) => {
                self.install_session(session);
                Ok(())
            }
            Err(e) => {
                self.fail_connect(&e);
                Err(e)
            }
        }
    }

    async fn try_handshake(&self) -> Result<TransportSession, ClientError> {
        let Some(token) = self.shared.credentials.bearer_token() else {
            return Err(ClientError::AuthenticationMissing);
        };
        let timeout = self.shared.config.handshake_timeout;
        time::timeout(timeout, self.handshake(&token))
            .await
            .map_err(|_| ClientError::HandshakeTimeout {
                ms: timeout.as_millis() as u64,
            })?
    }

    async fn handshake(&self, token: &str) -> Result<TransportSession, ClientError> {
        let headers = vec![("Authorization".to_string(), format!("Bearer {token}"))];
        let mut session = self
            .shared
            .transport
            .open(&self.shared.config.url, &headers)
            .await?;

        let heartbeat_ms = (self.shared.config.heartbeat_interval.as_millis() as u64, 0);
        session
            .outgoing
            .send(Frame::connect(token, heartbeat_ms).encode())
            .map_err(|_| ClientError::Transport("session closed before CONNECT".into()))?;

        loop {
            match session.incoming.recv().await {
                None => {
                    return Err(ClientError::Transport(
                        "connection closed during handshake".into(),
                    ))
                }
                Some(TransportEvent::Closed { code, .. }) => {
                    return Err(ClientError::AbnormalClose { code })
                }
                Some(TransportEvent::Frame(text)) => {
                    if Frame::is_heartbeat(&text) {
                        continue;
                    }
                    let frame = Frame::parse(&text)
                        .map_err(|e| ClientError::Transport(e.to_string()))?;
                    match frame.command {
                        Command::Connected => return Ok(session),
                        Command::Error => {
                            let message = frame
                                .header_value("message")
                                .unwrap_or("broker rejected CONNECT");
                            return Err(ClientError::Transport(message.to_string()));
                        }
                        other => {
                            tracing::debug!(command = %other, "ignoring frame during handshake");
                        }
                    }
                }
            }
        }
    }

    fn install_session(&self, session: TransportSession) {
        let TransportSession { outgoing, incoming } = session;
        let cancel = CancellationToken::new();
        let generation;
        let on_connected;
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if !inner.state.is_transitioning() {
                // disconnect() won the race while the handshake was in
                // flight — drop the fresh session instead of installing it.
                tracing::debug!("session established after teardown, dropping");
                return;
            }
            inner.state = ConnectionState::Connected;
            inner.attempt = 0;
            inner.generation += 1;
            generation = inner.generation;
            inner.outgoing = Some(outgoing.clone());
            if let Some(old) = inner.cancel.replace(cancel.clone()) {
                old.cancel();
            }
            on_connected = inner.on_connected.clone();
        }

        // Replay every subscription before the reader starts, so
        // resubscription happens-before any dispatch on this session.
        self.resubscribe_all(&outgoing);

        tokio::spawn(run_heartbeat(
            outgoing,
            self.shared.config.heartbeat_interval,
            cancel.child_token(),
        ));
        let manager = self.clone();
        tokio::spawn(async move {
            manager.run_session(incoming, generation, cancel).await;
        });

        tracing::info!(url = %self.shared.config.url, "connected");
        if let Some(callback) = on_connected {
            callback();
        }
    }

    fn resubscribe_all(&self, outgoing: &mpsc::UnboundedSender<String>) {
        for (destination, id, headers) in self.shared.registry.snapshot() {
            let mut frame = Frame::subscribe(&id, &destination);
            for (name, value) in headers {
                frame = frame.header(name, value);
            }
            if outgoing.send(frame.encode()).is_err() {
                tracing::warn!(destination = %destination, "session closed during resubscription");
                return;
            }
            tracing::debug!(destination = %destination, id = %id, "subscription replayed");
        }
    }

    async fn run_session(
        &self,
        mut incoming: mpsc::UnboundedReceiver<TransportEvent>,
        generation: u64,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => return,
                event = incoming.recv() => match event {
                    None => {
                        self.handle_close(generation, None, "stream ended");
                        return;
                    }
                    Some(TransportEvent::Closed { code, reason }) => {
                        self.handle_close(generation, code, &reason);
                        return;
                    }
                    Some(TransportEvent::Frame(text)) => {
                        if Frame::is_heartbeat(&text) {
                            continue;
                        }
                        match Frame::parse(&text) {
                            Err(e) => tracing::warn!(error = %e, "dropping malformed frame"),
                            Ok(frame) => match frame.command {
                                Command::Message => {
                                    {
                                        let inner = self.shared.inner.lock().unwrap();
                                        if inner.generation != generation
                                            || inner.state != ConnectionState::Connected
                                        {
                                            // Session torn down — drop in-flight frames.
                                            return;
                                        }
                                    }
                                    self.shared.dispatcher.dispatch(&self.shared.registry, &frame);
                                }
                                Command::Error => {
                                    let message = frame.header_value("message").unwrap_or("");
                                    tracing::warn!(message = %message, "broker error frame");
                                }
                                Command::Receipt => {
                                    tracing::debug!(
                                        id = frame.header_value("receipt-id").unwrap_or(""),
                                        "receipt"
                                    );
                                }
                                other => tracing::debug!(command = %other, "ignoring frame"),
                            },
                        }
                    }
                },
            }
        }
    }

    fn handle_close(&self, generation: u64, code: Option<u16>, reason: &str) {
        let on_error;
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if inner.generation != generation {
                return;
            }
            if let Some(cancel) = inner.cancel.take() {
                cancel.cancel();
            }
            inner.outgoing = None;
            inner.generation += 1;
            inner.state = ConnectionState::Disconnected;

            if code == Some(NORMAL_CLOSE_CODE) {
                tracing::info!("connection closed normally");
                return;
            }
            tracing::warn!(code = ?code, reason = %reason, "connection lost");
            on_error = inner.on_error.clone();
            self.schedule_reconnect(&mut inner);
        }
        if let Some(callback) = on_error {
            callback(&ClientError::AbnormalClose { code });
        }
    }

    fn fail_connect(&self, error: &ClientError) {
        let on_error;
        {
            let mut inner = self.shared.inner.lock().unwrap();
            if !inner.state.is_transitioning() {
                // The attempt was already torn down by disconnect().
                return;
            }
            inner.state = ConnectionState::Disconnected;
            on_error = inner.on_error.clone();
            if error.is_retryable() {
                self.schedule_reconnect(&mut inner);
            }
        }
        tracing::warn!(error = %error, "connect failed");
        if let Some(callback) = on_error {
            callback(error);
        }
    }

    fn schedule_reconnect(&self, inner: &mut ManagerInner) {
        let attempt = inner.attempt;
        let Some(delay) = self.shared.backoff.next_delay(attempt) else {
            tracing::warn!(attempts = attempt, "reconnect attempts exhausted, giving up");
            return;
        };
        inner.attempt = attempt + 1;
        let token = CancellationToken::new();
        if let Some(old) = inner.cancel.replace(token.clone()) {
            old.cancel();
        }
        tracing::info!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");

        let manager = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = time::sleep(delay) => {
                    {
                        let mut inner = manager.shared.inner.lock().unwrap();
                        if inner.state != ConnectionState::Disconnected {
                            return;
                        }
                        inner.state = ConnectionState::Reconnecting;
                    }
                    // Failures route back through fail_connect, which
                    // schedules the next attempt.
                    let _ = manager.establish().await;
                }
            }
        });
    }
}
