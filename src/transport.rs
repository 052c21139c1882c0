//! Transport abstraction for the Knowledge Battle protocol.
//!
//! The [`Transport`] trait is a bidirectional channel of JSON text frames
//! between the client and the game server. Framing is the implementor's job
//! (WebSocket frames, length-prefixed TCP, an in-process channel in tests).
//!
//! Connection setup is not part of the trait: build a connected transport
//! first, then hand it to
//! [`ConnectionProvider::start`](crate::connection::ConnectionProvider::start).
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use knowledge_battle_client::error::TriviaError;
//! use knowledge_battle_client::transport::Transport;
//! use tokio::sync::mpsc;
//!
//! struct ChannelTransport {
//!     tx: mpsc::UnboundedSender<String>,
//!     rx: mpsc::UnboundedReceiver<String>,
//! }
//!
//! #[async_trait]
//! impl Transport for ChannelTransport {
//!     async fn send(&mut self, message: String) -> Result<(), TriviaError> {
//!         self.tx.send(message).map_err(|e| TriviaError::TransportSend(e.to_string()))
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, TriviaError>> {
//!         self.rx.recv().await.map(Ok)
//!     }
//!
//!     async fn close(&mut self) -> Result<(), TriviaError> {
//!         self.rx.close();
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::TriviaError;

/// A bidirectional text frame transport.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame
/// and each call to [`recv`](Transport::recv) yields one.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) **MUST** be cancel-safe: the connection loop
/// polls it inside `tokio::select!`, and a cancelled call must not lose a
/// frame. Channel-backed implementations are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text frame to the server.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::TransportSend`] if the frame could not be sent.
    async fn send(&mut self, message: String) -> Result<(), TriviaError>;

    /// Receive the next JSON text frame from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))`: a complete frame was received
    /// - `Some(Err(e))`: a transport error occurred
    /// - `None`: the server closed the connection cleanly
    async fn recv(&mut self) -> Option<Result<String, TriviaError>>;

    /// Close the connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the close handshake fails. Resources are released
    /// regardless.
    async fn close(&mut self) -> Result<(), TriviaError>;
}
