//! Events delivered by the connection to its subscribers.

use crate::protocol::ServerMessage;

/// Something that happened on the connection.
///
/// Subscribers see these in the order the transport delivered them.
/// [`Disconnected`](ConnectionEvent::Disconnected) is always the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A well-formed event from the server.
    Message(ServerMessage),
    /// A frame that could not be parsed as a [`ServerMessage`].
    Malformed {
        /// Parser error description.
        error: String,
    },
    /// The connection ended. `reason` is `None` for a clean server close.
    Disconnected { reason: Option<String> },
}

impl From<ServerMessage> for ConnectionEvent {
    fn from(msg: ServerMessage) -> Self {
        Self::Message(msg)
    }
}
