//! The game session: the state machine hosted on a live connection.
//!
//! A [`GameSession`] holds an injected [`ConnectionHandle`], its own
//! [`Subscription`] and the loading-indicator deadline. Its owner drives it
//! one step at a time with [`next_update`](GameSession::next_update) and
//! calls the action methods in between, so state is never mutated
//! concurrently. Dropping the session deregisters the subscription and
//! forgets the deadline.
//!
//! # Example
//!
//! ```rust,ignore
//! let (mut provider, events) = ConnectionProvider::connect(&config).await?;
//! let mut session = GameSession::new(provider.connection(), events, &config);
//!
//! while session.next_update().await {
//!     println!("{}", session.screen(&lobby_input));
//! }
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::TriviaConfig;
use crate::connection::{ConnectionHandle, Subscription};
use crate::error::Result;
use crate::protocol::ClientMessage;
use crate::state::GameState;
use crate::view::{self, LobbyInput, Screen};

/// Client-side synchronization of one player's game.
#[derive(Debug)]
pub struct GameSession {
    connection: ConnectionHandle,
    events: Subscription,
    state: GameState,
    loading_delay: Duration,
    loading_deadline: Option<Instant>,
}

impl GameSession {
    /// Host a fresh [`GameState`] on `connection`, fed by `events`.
    pub fn new(connection: ConnectionHandle, events: Subscription, config: &TriviaConfig) -> Self {
        Self {
            connection,
            events,
            state: GameState::new(),
            loading_delay: config.loading_delay,
            loading_deadline: None,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Render the current snapshot.
    pub fn screen(&self, input: &LobbyInput) -> Screen {
        view::render(&self.state, input)
    }

    /// Wait for the next inbound event or the loading deadline and apply it.
    ///
    /// Returns `false` once the connection has ended and no more events
    /// will arrive. Cancel-safe: a cancelled call applies nothing.
    pub async fn next_update(&mut self) -> bool {
        let deadline = self.loading_deadline;
        tokio::select! {
            event = self.events.recv() => {
                let Some(event) = event else {
                    return false;
                };
                if let Some(reply) = self.state.apply_event(event) {
                    self.emit(reply);
                }
            }
            () = sleep_until_deadline(deadline), if deadline.is_some() => {
                self.loading_deadline = None;
                if self.state.loading_elapsed() {
                    debug!("no question yet, showing loading indicator");
                }
            }
        }
        self.sync_loading_timer();
        true
    }

    /// Answer the active question with `choice`.
    ///
    /// # Errors
    ///
    /// Returns the rejection from [`GameState::answer`], or
    /// [`TriviaError::NotConnected`](crate::TriviaError::NotConnected) if
    /// the connection is gone. Either way the notice is updated.
    pub fn submit_answer(&mut self, choice: &str) -> Result<()> {
        let msg = match self.state.answer(choice) {
            Ok(msg) => msg,
            Err(e) => {
                debug!("answer rejected: {e}");
                self.state.set_notice(e.to_string());
                return Err(e);
            }
        };
        self.connection.emit(msg).inspect_err(|e| {
            self.state.set_notice(e.to_string());
        })
    }

    /// Ask for a new game and go back to the lobby immediately.
    ///
    /// The local reset happens even if the request cannot be sent.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::NotConnected`](crate::TriviaError::NotConnected)
    /// if the connection is gone.
    pub fn restart(&mut self) -> Result<()> {
        let msg = self.state.restart();
        self.sync_loading_timer();
        self.connection.emit(msg).inspect_err(|e| {
            self.state.set_notice(e.to_string());
        })
    }

    /// Returns `true` while the loading deadline is pending.
    pub fn loading_timer_armed(&self) -> bool {
        self.loading_deadline.is_some()
    }

    fn emit(&mut self, msg: ClientMessage) {
        if let Err(e) = self.connection.emit(msg) {
            warn!("could not emit reply: {e}");
            self.state.set_notice(e.to_string());
        }
    }

    fn sync_loading_timer(&mut self) {
        if self.state.awaiting_question() {
            if self.loading_deadline.is_none() {
                self.loading_deadline = Some(Instant::now() + self.loading_delay);
            }
        } else {
            self.loading_deadline = None;
        }
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        debug!("game session torn down");
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
