#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Knowledge Battle client integration tests.
//!
//! Provides a channel-backed [`LoopbackTransport`] whose far end,
//! [`FakeServer`], lets a test push server frames whenever it likes and read
//! back what the client emitted.

use async_trait::async_trait;
use knowledge_battle_client::protocol::{ConnectPayload, Player, Question};
use knowledge_battle_client::{
    ClientMessage, ConnectionProvider, GameSession, ServerMessage, Transport, TriviaConfig,
    TriviaError,
};
use tokio::sync::mpsc;

// ── Loopback transport ──────────────────────────────────────────────

/// Client half of an in-process connection.
pub struct LoopbackTransport {
    to_server: mpsc::UnboundedSender<String>,
    from_server: mpsc::UnboundedReceiver<String>,
}

/// Server half of an in-process connection.
pub struct FakeServer {
    to_client: Option<mpsc::UnboundedSender<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

/// Create a connected `(transport, server)` pair.
pub fn loopback() -> (LoopbackTransport, FakeServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            to_server: client_tx,
            from_server: client_rx,
        },
        FakeServer {
            to_client: Some(server_tx),
            from_client: server_rx,
        },
    )
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), TriviaError> {
        self.to_server
            .send(message)
            .map_err(|e| TriviaError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, TriviaError>> {
        self.from_server.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), TriviaError> {
        self.from_server.close();
        Ok(())
    }
}

impl FakeServer {
    /// Deliver a typed event to the client.
    pub fn push(&self, msg: &ServerMessage) {
        self.push_raw(&serde_json::to_string(msg).unwrap());
    }

    /// Deliver an arbitrary text frame to the client.
    pub fn push_raw(&self, frame: &str) {
        self.to_client
            .as_ref()
            .expect("server already hung up")
            .send(frame.to_string())
            .unwrap();
    }

    /// Close the server side; the client sees a clean disconnect.
    pub fn hang_up(&mut self) {
        self.to_client = None;
    }

    /// Next event the client emitted.
    pub async fn next_from_client(&mut self) -> ClientMessage {
        let frame = tokio::time::timeout(std::time::Duration::from_secs(5), self.from_client.recv())
            .await
            .expect("client emitted nothing")
            .expect("client transport dropped");
        serde_json::from_str(&frame).unwrap()
    }

    /// Returns `true` if the client has emitted nothing further.
    pub fn client_is_quiet(&mut self) -> bool {
        self.from_client.try_recv().is_err()
    }
}

/// A transport that never delivers a frame and never finishes closing.
pub struct StuckTransport;

#[async_trait]
impl Transport for StuckTransport {
    async fn send(&mut self, _message: String) -> Result<(), TriviaError> {
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TriviaError>> {
        std::future::pending().await
    }

    async fn close(&mut self) -> Result<(), TriviaError> {
        std::future::pending().await
    }
}

// ── Session helpers ─────────────────────────────────────────────────

/// Start a connection and a session over a fresh loopback pair.
pub fn start_session(config: &TriviaConfig) -> (ConnectionProvider, GameSession, FakeServer) {
    let (transport, server) = loopback();
    let (provider, events) = ConnectionProvider::start(transport, config);
    let session = GameSession::new(provider.connection(), events, config);
    (provider, session, server)
}

// ── Message helpers ─────────────────────────────────────────────────

pub fn connect(id: &str) -> ServerMessage {
    ServerMessage::Connect(ConnectPayload { id: id.into() })
}

pub fn roster(entries: &[(&str, u32)]) -> Vec<Player> {
    entries
        .iter()
        .map(|(id, score)| Player::new(*id, *score))
        .collect()
}

pub fn two_plus_two() -> ServerMessage {
    ServerMessage::NewQuestion(Question::new("2+2?", ["3", "4", "5"]))
}
