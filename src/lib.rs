//! # Knowledge Battle Client
//!
//! Transport-agnostic Rust client for the Knowledge Battle real-time trivia
//! protocol.
//!
//! The server decides everything: matchmaking, questions, scoring and the
//! winner. This crate keeps one connection open, turns inbound events into
//! local [`GameState`], emits the player's actions, and renders the lobby,
//! question, scoreboard and game-over screens from that state.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] for any text-frame channel
//! - **WebSocket built-in**: default `transport-websocket` feature provides
//!   `WebSocketTransport`
//! - **Explicit lifecycle**: one [`ConnectionProvider`] per process, handles
//!   injected where needed, subscriptions released on drop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use knowledge_battle_client::{ConnectionProvider, GameSession, LobbyInput, TriviaConfig};
//!
//! let config = TriviaConfig::default();
//! let (mut provider, events) = ConnectionProvider::connect(&config).await?;
//! let mut session = GameSession::new(provider.connection(), events, &config);
//!
//! while session.next_update().await {
//!     println!("{}", session.screen(&LobbyInput::default()));
//! }
//! provider.shutdown().await;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod state;
pub mod transport;
pub mod transports;
pub mod view;

pub use config::TriviaConfig;
pub use connection::{ConnectionHandle, ConnectionProvider, Subscription};
pub use error::TriviaError;
pub use event::ConnectionEvent;
pub use protocol::{ClientMessage, Player, Question, ServerMessage};
pub use session::GameSession;
pub use state::{ConnectionStatus, Feedback, GameState, GameStatus};
pub use transport::Transport;
pub use view::{LobbyInput, Screen};

#[cfg(feature = "transport-websocket")]
pub use transports::WebSocketTransport;
