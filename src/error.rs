//! Error types for the Knowledge Battle client.

use thiserror::Error;

/// Errors that can occur when using the Knowledge Battle client.
#[derive(Debug, Error)]
pub enum TriviaError {
    /// Failed to send a frame through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a frame from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Attempted to emit an event, but the connection is gone.
    #[error("not connected to server")]
    NotConnected,

    /// An inbound event parsed but carried an unusable payload.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Tried to answer while no question is on screen.
    #[error("no active question")]
    NoActiveQuestion,

    /// The submitted choice is not one of the active question's options.
    #[error("choice {0:?} is not an option of the active question")]
    InvalidChoice(String),

    /// An answer was already submitted for the active question.
    #[error("an answer was already submitted for this question")]
    AlreadyAnswered,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Knowledge Battle client operations.
pub type Result<T> = std::result::Result<T, TriviaError>;
