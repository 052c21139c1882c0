//! The single long-lived connection to the game server.
//!
//! [`ConnectionProvider`] owns a background loop task that multiplexes
//! outbound events, inbound frames and a shutdown signal over one
//! [`Transport`]. Consumers get a cloneable [`ConnectionHandle`] injected
//! into them and observe inbound traffic through a [`Subscription`].
//!
//! # Example
//!
//! ```rust,ignore
//! let config = TriviaConfig::default();
//! let (mut provider, mut events) = ConnectionProvider::connect(&config).await?;
//! let connection = provider.connection();
//!
//! while let Some(event) = events.recv().await {
//!     if let ConnectionEvent::Message(ServerMessage::Connect(_)) = event {
//!         connection.join_game()?;
//!     }
//! }
//! provider.shutdown().await;
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

use crate::config::TriviaConfig;
use crate::error::{Result, TriviaError};
use crate::event::ConnectionEvent;
use crate::protocol::{ClientMessage, PlayerId, ServerMessage};
use crate::transport::Transport;

/// Reason attached to the final event when the client ends the connection.
const SHUTDOWN_REASON: &str = "client shut down";

// ── Shared state ────────────────────────────────────────────────────

/// State shared between every handle and the connection loop.
struct ConnectionState {
    connected: AtomicBool,
    connection_id: Mutex<Option<PlayerId>>,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            connection_id: Mutex::new(None),
        }
    }
}

// ── Handle ──────────────────────────────────────────────────────────

/// Cheap, cloneable capability to use the connection.
///
/// Every clone talks to the same connection loop. Emitting only queues the
/// event; it returns without waiting for the server.
#[derive(Clone)]
pub struct ConnectionHandle {
    cmd_tx: mpsc::UnboundedSender<ClientMessage>,
    events: broadcast::Sender<ConnectionEvent>,
    state: Arc<ConnectionState>,
}

impl ConnectionHandle {
    /// Queue an outbound event.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::NotConnected`] once the connection has ended.
    pub fn emit(&self, msg: ClientMessage) -> Result<()> {
        if !self.is_connected() {
            return Err(TriviaError::NotConnected);
        }
        debug!(event = msg.name(), "emitting");
        self.cmd_tx
            .send(msg)
            .map_err(|_| TriviaError::NotConnected)
    }

    /// Ask the server to match this client into a game.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::NotConnected`] once the connection has ended.
    pub fn join_game(&self) -> Result<()> {
        self.emit(ClientMessage::JoinGame)
    }

    /// Send `choice` as an answer, as is.
    ///
    /// No local checks are applied here. [`GameSession::submit_answer`]
    /// is the checked path: it requires an active question, a choice among
    /// its options and at most one answer per question.
    ///
    /// [`GameSession::submit_answer`]: crate::GameSession::submit_answer
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::NotConnected`] once the connection has ended.
    pub fn submit_answer(&self, choice: impl Into<String>) -> Result<()> {
        self.emit(ClientMessage::SubmitAnswer(choice.into()))
    }

    /// Ask the server for a new game.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::NotConnected`] once the connection has ended.
    pub fn restart_game(&self) -> Result<()> {
        self.emit(ClientMessage::RestartGame)
    }

    /// Register a new observer of inbound events.
    ///
    /// Only events published after this call are seen. Dropping the
    /// returned [`Subscription`] deregisters it.
    pub fn subscribe(&self) -> Subscription {
        let rx = self.events.subscribe();
        // `connected` is cleared before `Disconnected` is published, so a
        // receiver created after that point would otherwise wait forever.
        let finished = !self.is_connected();
        Subscription { rx, finished }
    }

    /// Returns `true` while the connection loop is running.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::Acquire)
    }

    /// The identifier the server assigned, once `connect` has arrived.
    pub async fn connection_id(&self) -> Option<PlayerId> {
        self.state.connection_id.lock().await.clone()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Returns `true` if both handles drive the same connection.
    pub fn same_connection(&self, other: &Self) -> bool {
        self.cmd_tx.same_channel(&other.cmd_tx)
    }

    fn publish_disconnected(&self, reason: Option<String>) {
        publish_disconnected(&self.events, &self.state, reason);
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("connected", &self.is_connected())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ── Subscription ────────────────────────────────────────────────────

/// A registered observer of [`ConnectionEvent`]s.
///
/// Dropping it deregisters the observer.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<ConnectionEvent>,
    finished: bool,
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// Returns `None` after [`ConnectionEvent::Disconnected`] has been
    /// yielded. Cancel-safe.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if matches!(event, ConnectionEvent::Disconnected { .. }) {
                        self.finished = true;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber fell behind, oldest events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!("subscription released");
    }
}

// ── Provider ────────────────────────────────────────────────────────

/// Owner of the connection loop.
///
/// Construct one at application start and call
/// [`shutdown`](Self::shutdown) when done. Dropping it aborts the loop.
pub struct ConnectionProvider {
    handle: ConnectionHandle,
    task: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    shutdown_timeout: Duration,
}

impl ConnectionProvider {
    /// Start the connection loop over an already-connected transport.
    ///
    /// The returned [`Subscription`] is registered before the loop reads its
    /// first frame, so it observes the `connect` event.
    #[must_use = "the subscription must be used to receive events"]
    pub fn start(transport: impl Transport, config: &TriviaConfig) -> (Self, Subscription) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();
        // tokio panics on a zero capacity.
        let (events, first_rx) = broadcast::channel(config.event_channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = Arc::new(ConnectionState::new());

        let task = tokio::spawn(connection_loop(
            transport,
            cmd_rx,
            events.clone(),
            Arc::clone(&state),
            shutdown_rx,
        ));

        let provider = Self {
            handle: ConnectionHandle {
                cmd_tx,
                events,
                state,
            },
            task: Some(task),
            shutdown_tx: Some(shutdown_tx),
            shutdown_timeout: config.shutdown_timeout,
        };
        let subscription = Subscription {
            rx: first_rx,
            finished: false,
        };

        (provider, subscription)
    }

    /// Open a WebSocket to `config.endpoint` and start the loop over it.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::Timeout`] if the handshake exceeds
    /// `config.connect_timeout`, or [`TriviaError::Io`] if it fails.
    #[cfg(feature = "transport-websocket")]
    pub async fn connect(config: &TriviaConfig) -> Result<(Self, Subscription)> {
        let transport = crate::transports::WebSocketTransport::connect_with_timeout(
            &config.endpoint,
            config.connect_timeout,
        )
        .await?;
        Ok(Self::start(transport, config))
    }

    /// The connection handle. Every call returns a handle to the same
    /// connection.
    pub fn connection(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    /// Close the transport and stop the loop.
    ///
    /// Waits up to the configured shutdown timeout, then aborts. Calling it
    /// twice is harmless.
    pub async fn shutdown(&mut self) {
        debug!("connection shutdown requested");

        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(mut task) = self.task.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("connection loop terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("connection loop did not exit within timeout; aborting");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("connection loop aborted: {join_err}");
                    }
                }
            }
        }

        // An aborted loop never got to say goodbye.
        self.handle.publish_disconnected(Some(SHUTDOWN_REASON.into()));
    }
}

impl std::fmt::Debug for ConnectionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionProvider")
            .field("connected", &self.handle.is_connected())
            .field("has_task", &self.task.is_some())
            .finish()
    }
}

impl Drop for ConnectionProvider {
    fn drop(&mut self) {
        // No executor here to drive a graceful close; abort instead.
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.handle.publish_disconnected(Some(SHUTDOWN_REASON.into()));
    }
}

// ── Connection loop ─────────────────────────────────────────────────

/// Exits when shutdown is signalled, every handle is dropped, the server
/// closes the connection, or the transport fails.
async fn connection_loop(
    mut transport: impl Transport,
    mut cmd_rx: mpsc::UnboundedReceiver<ClientMessage>,
    events: broadcast::Sender<ConnectionEvent>,
    state: Arc<ConnectionState>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!("connection loop started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(msg) = cmd else {
                    debug!("all handles dropped, closing connection");
                    let _ = transport.close().await;
                    publish_disconnected(&events, &state, Some(SHUTDOWN_REASON.into()));
                    break;
                };
                match msg.to_frame() {
                    Ok(frame) => {
                        if let Err(e) = transport.send(frame).await {
                            error!("transport send error: {e}");
                            publish_disconnected(
                                &events,
                                &state,
                                Some(format!("transport send error: {e}")),
                            );
                            break;
                        }
                    }
                    // Serialization failures are local bugs; keep the connection.
                    Err(e) => error!(event = msg.name(), "failed to serialize outbound event: {e}"),
                }
            }

            _ = &mut shutdown_rx => {
                debug!("shutdown signal received");
                let _ = transport.close().await;
                publish_disconnected(&events, &state, Some(SHUTDOWN_REASON.into()));
                break;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(frame)) => match serde_json::from_str::<ServerMessage>(&frame) {
                        Ok(msg) => {
                            debug!(event = msg.name(), "received");
                            if let ServerMessage::Connect(payload) = &msg {
                                *state.connection_id.lock().await = Some(payload.id.clone());
                            }
                            publish(&events, ConnectionEvent::Message(msg));
                        }
                        Err(e) => {
                            warn!("malformed frame: {e}; raw: {frame}");
                            publish(&events, ConnectionEvent::Malformed { error: e.to_string() });
                        }
                    },
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        publish_disconnected(
                            &events,
                            &state,
                            Some(format!("transport receive error: {e}")),
                        );
                        break;
                    }
                    None => {
                        debug!("connection closed by server");
                        publish_disconnected(&events, &state, None);
                        break;
                    }
                }
            }
        }
    }

    debug!("connection loop exited");
}

fn publish(events: &broadcast::Sender<ConnectionEvent>, event: ConnectionEvent) {
    if events.send(event).is_err() {
        debug!("no subscribers, event dropped");
    }
}

/// Mark the connection down, then publish the final event.
///
/// Only the first caller publishes, so `Disconnected` is seen at most once.
fn publish_disconnected(
    events: &broadcast::Sender<ConnectionEvent>,
    state: &ConnectionState,
    reason: Option<String>,
) {
    if state.connected.swap(false, Ordering::AcqRel) {
        publish(events, ConnectionEvent::Disconnected { reason });
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{ConnectPayload, Player};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    type Script = Vec<Option<std::result::Result<String, TriviaError>>>;

    /// Replays scripted frames and records what the client sent.
    struct ScriptedTransport {
        incoming: VecDeque<Option<std::result::Result<String, TriviaError>>>,
        sent: Arc<StdMutex<Vec<String>>>,
        closed: Arc<AtomicBool>,
    }

    impl ScriptedTransport {
        fn new(script: Script) -> (Self, Arc<StdMutex<Vec<String>>>, Arc<AtomicBool>) {
            let sent = Arc::new(StdMutex::new(Vec::new()));
            let closed = Arc::new(AtomicBool::new(false));
            let transport = Self {
                incoming: VecDeque::from(script),
                sent: Arc::clone(&sent),
                closed: Arc::clone(&closed),
            };
            (transport, sent, closed)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, message: String) -> std::result::Result<(), TriviaError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }

        async fn recv(&mut self) -> Option<std::result::Result<String, TriviaError>> {
            match self.incoming.pop_front() {
                Some(item) => item,
                None => std::future::pending().await,
            }
        }

        async fn close(&mut self) -> std::result::Result<(), TriviaError> {
            self.closed.store(true, Ordering::Relaxed);
            Ok(())
        }
    }

    fn frame(msg: &ServerMessage) -> Option<std::result::Result<String, TriviaError>> {
        Some(Ok(serde_json::to_string(msg).unwrap()))
    }

    fn connect_frame(id: &str) -> Option<std::result::Result<String, TriviaError>> {
        frame(&ServerMessage::Connect(ConnectPayload { id: id.into() }))
    }

    #[tokio::test]
    async fn first_subscription_sees_connect() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![connect_frame("A")]);
        let (mut provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());

        let event = events.recv().await.unwrap();
        assert_eq!(
            event,
            ConnectionEvent::Message(ServerMessage::Connect(ConnectPayload { id: "A".into() }))
        );
        assert_eq!(provider.connection().connection_id().await.as_deref(), Some("A"));

        provider.shutdown().await;
    }

    #[tokio::test]
    async fn connection_returns_the_same_handle() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![]);
        let (mut provider, _events) = ConnectionProvider::start(transport, &TriviaConfig::default());

        let a = provider.connection();
        let b = provider.connection();
        assert!(a.same_connection(&b));

        let (other_transport, _, _) = ScriptedTransport::new(vec![]);
        let (mut other, _other_events) =
            ConnectionProvider::start(other_transport, &TriviaConfig::default());
        assert!(!a.same_connection(&other.connection()));

        provider.shutdown().await;
        other.shutdown().await;
    }

    #[tokio::test]
    async fn outbound_events_are_serialized_in_order() {
        let (transport, sent, _closed) = ScriptedTransport::new(vec![]);
        let (mut provider, _events) = ConnectionProvider::start(transport, &TriviaConfig::default());
        let connection = provider.connection();

        connection.join_game().unwrap();
        connection.submit_answer("4").unwrap();
        connection.restart_game().unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        {
            let sent = sent.lock().unwrap();
            assert_eq!(
                *sent,
                vec![
                    r#"{"event":"join_game"}"#.to_string(),
                    r#"{"event":"submit_answer","data":"4"}"#.to_string(),
                    r#"{"event":"restart_game"}"#.to_string(),
                ]
            );
        }

        provider.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_frame_is_reported_and_loop_continues() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![
            Some(Ok("{not json".into())),
            frame(&ServerMessage::ScoreUpdate(vec![Player::new("A", 1)])),
        ]);
        let (mut provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());

        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Malformed { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            ConnectionEvent::Message(ServerMessage::ScoreUpdate(_))
        ));
        assert!(provider.connection().is_connected());

        provider.shutdown().await;
    }

    #[tokio::test]
    async fn server_close_ends_the_subscription() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![connect_frame("A"), None]);
        let (mut provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());

        let _ = events.recv().await; // connect
        assert_eq!(
            events.recv().await,
            Some(ConnectionEvent::Disconnected { reason: None })
        );
        assert_eq!(events.recv().await, None);
        assert!(!provider.connection().is_connected());

        provider.shutdown().await;
    }

    #[tokio::test]
    async fn receive_error_disconnects_with_reason() {
        let (transport, _sent, _closed) =
            ScriptedTransport::new(vec![Some(Err(TriviaError::TransportReceive("reset".into())))]);
        let (mut provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());

        let Some(ConnectionEvent::Disconnected { reason }) = events.recv().await else {
            panic!("expected Disconnected");
        };
        assert!(reason.unwrap().contains("reset"));

        provider.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_closes_transport_and_rejects_emits() {
        let (transport, _sent, closed) = ScriptedTransport::new(vec![]);
        let (mut provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());
        let connection = provider.connection();

        provider.shutdown().await;

        assert!(closed.load(Ordering::Relaxed));
        assert!(matches!(
            events.recv().await,
            Some(ConnectionEvent::Disconnected { .. })
        ));
        assert!(matches!(
            connection.join_game(),
            Err(TriviaError::NotConnected)
        ));

        // A second shutdown is a no-op.
        provider.shutdown().await;
    }

    #[tokio::test]
    async fn late_subscription_after_disconnect_finishes_immediately() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![None]);
        let (mut provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());
        let _ = events.recv().await; // Disconnected

        let mut late = provider.connection().subscribe();
        assert_eq!(late.recv().await, None);

        provider.shutdown().await;
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![]);
        let (mut provider, mut first) = ConnectionProvider::start(transport, &TriviaConfig::default());
        let mut second = provider.connection().subscribe();

        provider.shutdown().await;

        assert!(matches!(
            first.recv().await,
            Some(ConnectionEvent::Disconnected { .. })
        ));
        assert!(matches!(
            second.recv().await,
            Some(ConnectionEvent::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn zero_shutdown_timeout_aborts_stuck_loop() {
        struct StuckTransport;

        #[async_trait]
        impl Transport for StuckTransport {
            async fn send(&mut self, _message: String) -> std::result::Result<(), TriviaError> {
                Ok(())
            }
            async fn recv(&mut self) -> Option<std::result::Result<String, TriviaError>> {
                std::future::pending().await
            }
            async fn close(&mut self) -> std::result::Result<(), TriviaError> {
                std::future::pending().await
            }
        }

        let config = TriviaConfig::default().with_shutdown_timeout(Duration::ZERO);
        let (mut provider, mut events) = ConnectionProvider::start(StuckTransport, &config);

        tokio::time::timeout(Duration::from_secs(2), provider.shutdown())
            .await
            .expect("shutdown should not hang");
        assert!(!provider.connection().is_connected());
        assert_eq!(
            events.recv().await,
            Some(ConnectionEvent::Disconnected {
                reason: Some("client shut down".into())
            })
        );
        assert_eq!(events.recv().await, None);
    }

    #[tokio::test]
    async fn dropping_the_provider_ends_subscriptions() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![]);
        let (provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());
        let connection = provider.connection();

        drop(provider);

        assert_eq!(
            events.recv().await,
            Some(ConnectionEvent::Disconnected {
                reason: Some("client shut down".into())
            })
        );
        assert_eq!(events.recv().await, None);
        assert!(matches!(
            connection.join_game(),
            Err(TriviaError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn disconnect_is_published_once() {
        let (transport, _sent, _closed) = ScriptedTransport::new(vec![None]);
        let (mut provider, mut events) = ConnectionProvider::start(transport, &TriviaConfig::default());

        assert_eq!(
            events.recv().await,
            Some(ConnectionEvent::Disconnected { reason: None })
        );
        provider.shutdown().await;
        drop(provider);

        // Nothing queued behind the first Disconnected.
        assert!(events.rx.try_recv().is_err());
    }
}
