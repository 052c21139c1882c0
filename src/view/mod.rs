//! Screens rendered from a [`GameState`] snapshot.
//!
//! Every view is a plain value computed by a pure function of the state
//! (plus the lobby's local input) and renders as text through `Display`.
//! Views never talk to the connection; actions go through
//! [`GameSession`](crate::GameSession).

use std::fmt;

use crate::state::{GameState, GameStatus};

pub mod game_over;
pub mod lobby;
pub mod question;
pub mod scoreboard;

pub use game_over::{GameOverView, Outcome};
pub use lobby::{Clipboard, JoinCode, LobbyInput, LobbyView, MemoryClipboard};
pub use question::{OptionButton, QuestionPanel};
pub use scoreboard::{ScoreRow, ScoreboardView};

/// What the player sees right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// Banner shown above the body, if something went wrong.
    pub notice: Option<String>,
    pub body: Body,
}

/// The main content of a [`Screen`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Lobby(LobbyView),
    Playing {
        scoreboard: ScoreboardView,
        panel: QuestionPanel,
    },
    GameOver(GameOverView),
}

/// Pick and build the screen for `state`.
pub fn render(state: &GameState, input: &LobbyInput) -> Screen {
    let body = match (state.status(), state.winner()) {
        (GameStatus::Lobby, _) => Body::Lobby(LobbyView::new(state, input)),
        (GameStatus::GameOver, Some(winner)) => {
            Body::GameOver(GameOverView::new(winner, state.self_id()))
        }
        _ => Body::Playing {
            scoreboard: ScoreboardView::new(state),
            panel: QuestionPanel::new(state),
        },
    };
    Screen {
        notice: state.notice().map(str::to_string),
        body,
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(notice) = &self.notice {
            writeln!(f, "⚠ {notice}")?;
            writeln!(f)?;
        }
        match &self.body {
            Body::Lobby(lobby) => write!(f, "{lobby}"),
            Body::Playing { scoreboard, panel } => {
                writeln!(f, "{scoreboard}")?;
                write!(f, "{panel}")
            }
            Body::GameOver(game_over) => write!(f, "{game_over}"),
        }
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
    use crate::protocol::{ConnectPayload, Player, Question, ServerMessage};

    fn state_for(id: &str, events: Vec<ServerMessage>) -> GameState {
        let mut state = GameState::new();
        state.apply(ServerMessage::Connect(ConnectPayload { id: id.into() }));
        for event in events {
            state.apply(event);
        }
        state
    }

    #[test]
    fn lobby_status_renders_lobby() {
        let state = state_for("A", vec![]);
        let screen = render(&state, &LobbyInput::default());
        assert!(matches!(screen.body, Body::Lobby(_)));
        assert!(screen.to_string().contains("Knowledge Battle"));
    }

    #[test]
    fn playing_renders_scoreboard_and_panel() {
        let state = state_for(
            "A",
            vec![
                ServerMessage::GameStart(vec![Player::new("A", 0), Player::new("B", 0)]),
                ServerMessage::NewQuestion(Question::new("2+2?", ["3", "4", "5"])),
            ],
        );
        let screen = render(&state, &LobbyInput::default());
        let Body::Playing { scoreboard, panel } = &screen.body else {
            panic!("expected Playing, got {:?}", screen.body);
        };
        assert_eq!(scoreboard.rows.len(), 2);
        assert!(matches!(panel, QuestionPanel::Question { .. }));
        let text = screen.to_string();
        assert!(text.contains("Scoreboard"));
        assert!(text.contains("2+2?"));
    }

    #[test]
    fn game_over_renders_outcome() {
        let state = state_for(
            "A",
            vec![
                ServerMessage::GameStart(vec![Player::new("A", 0), Player::new("B", 0)]),
                ServerMessage::GameOver("B".into()),
            ],
        );
        let screen = render(&state, &LobbyInput::default());
        assert!(screen.to_string().contains("You Lost!"));
    }

    #[test]
    fn notice_is_shown_as_banner() {
        let mut state = state_for("A", vec![]);
        state.set_notice("server hiccup");
        let text = render(&state, &LobbyInput::default()).to_string();
        assert!(text.starts_with("⚠ server hiccup"));
    }
}
