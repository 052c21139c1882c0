//! Lobby screen and its local join-code field.

use std::fmt;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::{ConnectionStatus, GameState};

const JOIN_CODE_LEN: usize = 6;

/// Seats in a match.
const SEATS: usize = 2;

/// A short, human-shareable code for inviting an opponent.
///
/// Only used by the lobby UI; the server never sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCode(String);

impl JoinCode {
    /// Six upper-case hex characters from a random UUID.
    pub fn generate() -> Self {
        let code = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(JOIN_CODE_LEN)
            .collect::<String>()
            .to_uppercase();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform clipboard.
pub trait Clipboard {
    /// Replace the clipboard contents with `text`.
    ///
    /// # Errors
    ///
    /// Returns the platform's error if the write is refused.
    fn write_text(&mut self, text: &str) -> std::io::Result<()>;
}

/// A process-local clipboard, for terminals without one and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> std::io::Result<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}

/// Ephemeral input owned by the lobby screen.
#[derive(Debug, Clone, Default)]
pub struct LobbyInput {
    join_code: String,
}

impl LobbyInput {
    pub fn join_code(&self) -> &str {
        &self.join_code
    }

    /// Replace the field's text. Surrounding whitespace is dropped.
    pub fn set_join_code(&mut self, code: &str) {
        self.join_code = code.trim().to_string();
    }

    /// Fill the field with a fresh code.
    pub fn generate_join_code(&mut self) -> JoinCode {
        let code = JoinCode::generate();
        self.join_code = code.as_str().to_string();
        code
    }

    /// Copy the join code to `clipboard`.
    ///
    /// Best effort: an empty field or a refused write is logged and reported
    /// as `false`, never as an error.
    pub fn copy_join_code(&self, clipboard: &mut dyn Clipboard) -> bool {
        if self.join_code.is_empty() {
            debug!("no join code to copy");
            return false;
        }
        match clipboard.write_text(&self.join_code) {
            Ok(()) => true,
            Err(e) => {
                warn!("could not copy join code: {e}");
                false
            }
        }
    }
}

/// The matchmaking screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyView {
    /// Players already seated; always this client while matchmaking.
    pub players_present: usize,
    pub seats: usize,
    pub join_code: Option<String>,
    pub connected: bool,
}

impl LobbyView {
    pub fn new(state: &GameState, input: &LobbyInput) -> Self {
        let join_code = Some(input.join_code())
            .filter(|code| !code.is_empty())
            .map(str::to_string);
        Self {
            players_present: 1,
            seats: SEATS,
            join_code,
            connected: *state.connection() == ConnectionStatus::Connected,
        }
    }

    fn status_line(&self) -> &'static str {
        if self.connected {
            "Waiting for opponents to join..."
        } else {
            "Connecting to the game server..."
        }
    }
}

impl fmt::Display for LobbyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "🧠 Knowledge Battle")?;
        writeln!(f, "{}", self.status_line())?;
        writeln!(f)?;
        let open = self.seats.saturating_sub(self.players_present);
        writeln!(
            f,
            "Players in lobby: {}{}",
            "● ".repeat(self.players_present),
            "? ".repeat(open).trim_end()
        )?;
        if let Some(code) = &self.join_code {
            writeln!(f, "Join code: {code}  [c] copy")?;
        }
        writeln!(f)?;
        writeln!(f, "Get ready to test your knowledge!")?;
        writeln!(
            f,
            "The game will start automatically when another player joins."
        )?;
        writeln!(f, "[q] Cancel Matchmaking")
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::{ConnectPayload, ServerMessage};

    struct RefusingClipboard;

    impl Clipboard for RefusingClipboard {
        fn write_text(&mut self, _text: &str) -> std::io::Result<()> {
            Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "clipboard locked",
            ))
        }
    }

    #[test]
    fn generated_code_is_six_upper_hex_chars() {
        let code = JoinCode::generate();
        assert_eq!(code.as_str().len(), JOIN_CODE_LEN);
        assert!(code
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn copy_writes_the_field() {
        let mut input = LobbyInput::default();
        input.set_join_code("  ABC123 ");
        let mut clipboard = MemoryClipboard::default();
        assert!(input.copy_join_code(&mut clipboard));
        assert_eq!(clipboard.contents(), Some("ABC123"));
    }

    #[test]
    fn copy_is_best_effort() {
        let mut input = LobbyInput::default();
        let mut clipboard = MemoryClipboard::default();
        assert!(!input.copy_join_code(&mut clipboard));

        input.generate_join_code();
        assert!(!input.copy_join_code(&mut RefusingClipboard));
    }

    #[test]
    fn lobby_reflects_connection_and_code() {
        let mut state = GameState::new();
        let mut input = LobbyInput::default();
        let view = LobbyView::new(&state, &input);
        assert!(!view.connected);
        assert!(view.join_code.is_none());
        assert!(view.to_string().contains("Connecting"));

        state.apply(ServerMessage::Connect(ConnectPayload { id: "A".into() }));
        input.set_join_code("XYZ789");
        let text = LobbyView::new(&state, &input).to_string();
        assert!(text.contains("Waiting for opponents to join..."));
        assert!(text.contains("Join code: XYZ789"));
        assert!(text.contains("Cancel Matchmaking"));
    }
}
