//! Local game state and the transitions inbound events drive.
//!
//! [`GameState`] is a plain value: applying an event mutates it and
//! optionally returns the outbound event the client must emit in response.
//! It owns no timers or connections; [`GameSession`](crate::GameSession)
//! wires it to those.

use tracing::{debug, warn};

use crate::error::{Result, TriviaError};
use crate::event::ConnectionEvent;
use crate::protocol::{ClientMessage, Player, PlayerId, Question, ServerMessage};

/// Which screen the game is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameStatus {
    /// Waiting to be matched.
    #[default]
    Lobby,
    /// A game is running.
    Playing,
    /// The game ended and a winner is known.
    GameOver,
}

/// Outcome of the most recently submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Wrong,
}

impl Feedback {
    /// Text shown under the options.
    pub fn message(self) -> &'static str {
        match self {
            Self::Correct => "🎉 Correct!",
            Self::Wrong => "❌ Wrong!",
        }
    }
}

/// Whether the connection is usable, as far as the game knows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Transport is up but the server has not sent `connect` yet.
    #[default]
    Connecting,
    /// `connect` received; the self identifier is known.
    Connected,
    /// The connection ended. `reason` is `None` for a clean server close.
    Disconnected { reason: Option<String> },
}

/// Snapshot of everything the screens render.
///
/// `winner` is only ever set while `status` is [`GameStatus::GameOver`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GameState {
    self_id: Option<PlayerId>,
    players: Vec<Player>,
    status: GameStatus,
    question: Option<Question>,
    winner: Option<PlayerId>,
    feedback: Option<Feedback>,
    loading_question: bool,
    answered: bool,
    connection: ConnectionStatus,
    notice: Option<String>,
}

impl GameState {
    /// Fresh state: lobby, no identity, nothing on screen.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    /// Roster in the order the server sent it.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Roster by descending score. Ties keep the server's order.
    pub fn ranked_players(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn winner(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    pub fn feedback(&self) -> Option<Feedback> {
        self.feedback
    }

    /// `true` once the loading delay has passed without a question.
    pub fn is_loading(&self) -> bool {
        self.loading_question
    }

    /// `true` if an answer was submitted for the active question.
    pub fn has_answered(&self) -> bool {
        self.answered
    }

    pub fn connection(&self) -> &ConnectionStatus {
        &self.connection
    }

    /// The latest problem worth telling the player about.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Returns `true` if `id` is this client.
    pub fn is_self(&self, id: &str) -> bool {
        self.self_id.as_deref() == Some(id)
    }

    /// Returns `true` while a live game runs with no question yet, which is
    /// when the loading timer should be armed.
    pub fn awaiting_question(&self) -> bool {
        self.status == GameStatus::Playing
            && self.question.is_none()
            && !self.loading_question
            && !matches!(self.connection, ConnectionStatus::Disconnected { .. })
    }

    // ── Inbound ─────────────────────────────────────────────────────

    /// Apply one connection event. Returns the outbound event to emit, if any.
    pub fn apply_event(&mut self, event: ConnectionEvent) -> Option<ClientMessage> {
        match event {
            ConnectionEvent::Message(msg) => self.apply(msg),
            ConnectionEvent::Malformed { error } => {
                self.notice = Some(format!("Ignored a malformed server message: {error}"));
                None
            }
            ConnectionEvent::Disconnected { reason } => {
                self.notice = Some(match &reason {
                    Some(reason) => format!("Disconnected from server: {reason}"),
                    None => "Disconnected from server".to_string(),
                });
                self.connection = ConnectionStatus::Disconnected { reason };
                self.loading_question = false;
                None
            }
        }
    }

    /// Apply one server event. Returns the outbound event to emit, if any.
    ///
    /// Events whose precondition does not hold are ignored. Invalid payloads
    /// leave the state untouched apart from the notice.
    pub fn apply(&mut self, msg: ServerMessage) -> Option<ClientMessage> {
        if let Err(e) = msg.validate() {
            warn!(event = msg.name(), "rejected: {e}");
            self.notice = Some(e.to_string());
            return None;
        }

        match msg {
            ServerMessage::Connect(payload) => {
                debug!(id = %payload.id, "connected");
                self.self_id = Some(payload.id);
                self.connection = ConnectionStatus::Connected;
                return Some(ClientMessage::JoinGame);
            }
            ServerMessage::GameStart(players) if self.status == GameStatus::Lobby => {
                debug!(players = players.len(), "game started");
                self.players = players;
                self.status = GameStatus::Playing;
                self.notice = None;
            }
            ServerMessage::NewQuestion(question) if self.status == GameStatus::Playing => {
                debug!(prompt = %question.prompt, "new question");
                self.question = Some(question);
                self.feedback = None;
                self.loading_question = false;
                self.answered = false;
                self.notice = None;
            }
            ServerMessage::ScoreUpdate(players) => {
                self.players = players;
            }
            ServerMessage::PointAwarded if self.status == GameStatus::Playing => {
                self.feedback = Some(Feedback::Correct);
            }
            ServerMessage::WrongAnswer if self.status == GameStatus::Playing => {
                self.feedback = Some(Feedback::Wrong);
            }
            ServerMessage::GameOver(winner) => {
                debug!(%winner, "game over");
                self.winner = Some(winner);
                self.status = GameStatus::GameOver;
                self.loading_question = false;
            }
            other => {
                debug!(event = other.name(), status = ?self.status, "ignored in current status");
            }
        }
        None
    }

    /// The loading delay elapsed. Shows the indicator if still waiting.
    ///
    /// Returns `true` if the indicator was turned on.
    pub fn loading_elapsed(&mut self) -> bool {
        if self.status == GameStatus::Playing && self.question.is_none() {
            self.loading_question = true;
            return true;
        }
        false
    }

    // ── User actions ────────────────────────────────────────────────

    /// Check `choice` against the active question and mark it answered.
    ///
    /// # Errors
    ///
    /// - [`TriviaError::NoActiveQuestion`] outside a game or before a question
    /// - [`TriviaError::InvalidChoice`] if `choice` is not an option
    /// - [`TriviaError::AlreadyAnswered`] on a second answer to one question
    pub fn answer(&mut self, choice: &str) -> Result<ClientMessage> {
        let question = match (&self.status, &self.question) {
            (GameStatus::Playing, Some(question)) => question,
            _ => return Err(TriviaError::NoActiveQuestion),
        };
        if !question.has_option(choice) {
            return Err(TriviaError::InvalidChoice(choice.to_string()));
        }
        if self.answered {
            return Err(TriviaError::AlreadyAnswered);
        }
        self.answered = true;
        Ok(ClientMessage::SubmitAnswer(choice.to_string()))
    }

    /// Return to the lobby without waiting for the server.
    ///
    /// The last roster and the identity survive; everything tied to the
    /// finished game is cleared.
    pub fn restart(&mut self) -> ClientMessage {
        self.status = GameStatus::Lobby;
        self.winner = None;
        self.question = None;
        self.feedback = None;
        self.loading_question = false;
        self.answered = false;
        ClientMessage::RestartGame
    }

    /// Record a failed user action so the screen can show it.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
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
    use crate::protocol::ConnectPayload;

    fn connected(id: &str) -> GameState {
        let mut state = GameState::new();
        let effect = state.apply(ServerMessage::Connect(ConnectPayload { id: id.into() }));
        assert_eq!(effect, Some(ClientMessage::JoinGame));
        state
    }

    fn playing(id: &str) -> GameState {
        let mut state = connected(id);
        state.apply(ServerMessage::GameStart(vec![
            Player::new("A", 0),
            Player::new("B", 0),
        ]));
        state
    }

    fn two_plus_two() -> Question {
        Question::new("2+2?", ["3", "4", "5"])
    }

    #[test]
    fn connect_captures_identity_and_joins() {
        let state = connected("A");
        assert_eq!(state.self_id(), Some("A"));
        assert_eq!(state.connection(), &ConnectionStatus::Connected);
        assert_eq!(state.status(), GameStatus::Lobby);
    }

    #[test]
    fn game_start_enters_playing_with_roster() {
        let state = playing("A");
        assert_eq!(state.status(), GameStatus::Playing);
        assert_eq!(state.players().len(), 2);
        assert!(state.awaiting_question());
    }

    #[test]
    fn game_start_outside_lobby_is_ignored() {
        let mut state = playing("A");
        state.apply(ServerMessage::GameStart(vec![Player::new("Z", 9)]));
        assert_eq!(state.players()[0].id, "A");
    }

    #[test]
    fn new_question_in_lobby_is_ignored() {
        let mut state = connected("A");
        state.apply(ServerMessage::NewQuestion(two_plus_two()));
        assert!(state.question().is_none());
    }

    #[test]
    fn new_question_clears_feedback_and_loading() {
        let mut state = playing("A");
        assert!(state.loading_elapsed());
        state.apply(ServerMessage::NewQuestion(two_plus_two()));
        state.apply(ServerMessage::WrongAnswer);
        assert_eq!(state.feedback(), Some(Feedback::Wrong));

        state.apply(ServerMessage::NewQuestion(Question::new("1+1?", ["2", "3"])));
        assert_eq!(state.feedback(), None);
        assert!(!state.is_loading());
        assert_eq!(state.question().unwrap().prompt, "1+1?");
    }

    #[test]
    fn feedback_follows_latest_verdict() {
        let mut state = playing("A");
        state.apply(ServerMessage::PointAwarded);
        assert_eq!(state.feedback(), Some(Feedback::Correct));
        state.apply(ServerMessage::WrongAnswer);
        assert_eq!(state.feedback(), Some(Feedback::Wrong));
    }

    #[test]
    fn verdicts_outside_a_game_are_ignored() {
        let mut state = connected("A");
        state.apply(ServerMessage::PointAwarded);
        assert_eq!(state.feedback(), None);
    }

    #[test]
    fn score_update_replaces_roster_in_any_status() {
        let mut state = connected("A");
        state.apply(ServerMessage::ScoreUpdate(vec![Player::new("A", 2)]));
        assert_eq!(state.players(), &[Player::new("A", 2)]);

        state.apply(ServerMessage::ScoreUpdate(vec![
            Player::new("A", 2),
            Player::new("B", 5),
        ]));
        assert_eq!(state.players().len(), 2);
    }

    #[test]
    fn ranking_is_descending_and_stable_on_ties() {
        let mut state = playing("A");
        state.apply(ServerMessage::ScoreUpdate(vec![
            Player::new("A", 1),
            Player::new("B", 3),
            Player::new("C", 1),
        ]));
        let ids: Vec<&str> = state.ranked_players().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
        // Stored order is untouched.
        assert_eq!(state.players()[0].id, "A");
    }

    #[test]
    fn game_over_from_any_status_records_winner() {
        for mut state in [connected("A"), playing("A")] {
            state.apply(ServerMessage::GameOver("B".into()));
            assert_eq!(state.status(), GameStatus::GameOver);
            assert_eq!(state.winner(), Some("B"));
        }
    }

    #[test]
    fn restart_resets_eagerly() {
        let mut state = playing("A");
        state.apply(ServerMessage::NewQuestion(two_plus_two()));
        state.apply(ServerMessage::PointAwarded);
        state.apply(ServerMessage::GameOver("A".into()));

        assert_eq!(state.restart(), ClientMessage::RestartGame);
        assert_eq!(state.status(), GameStatus::Lobby);
        assert_eq!(state.winner(), None);
        assert_eq!(state.question(), None);
        assert_eq!(state.feedback(), None);
        assert_eq!(state.self_id(), Some("A"));
    }

    #[test]
    fn loading_only_while_playing_without_question() {
        let mut state = connected("A");
        assert!(!state.loading_elapsed());

        let mut state = playing("A");
        state.apply(ServerMessage::NewQuestion(two_plus_two()));
        assert!(!state.loading_elapsed());
        assert!(!state.is_loading());
    }

    #[test]
    fn one_answer_per_question() {
        let mut state = playing("A");
        assert!(matches!(state.answer("4"), Err(TriviaError::NoActiveQuestion)));

        state.apply(ServerMessage::NewQuestion(two_plus_two()));
        assert!(matches!(state.answer("7"), Err(TriviaError::InvalidChoice(_))));
        assert_eq!(
            state.answer("4").unwrap(),
            ClientMessage::SubmitAnswer("4".into())
        );
        assert!(matches!(state.answer("3"), Err(TriviaError::AlreadyAnswered)));

        state.apply(ServerMessage::NewQuestion(Question::new("1+1?", ["2", "3"])));
        assert!(!state.has_answered());
        assert!(state.answer("2").is_ok());
    }

    #[test]
    fn invalid_question_is_rejected_with_notice() {
        let mut state = playing("A");
        state.apply(ServerMessage::NewQuestion(two_plus_two()));
        state.apply(ServerMessage::NewQuestion(Question::new("broken", ["only"])));

        assert_eq!(state.question().unwrap().prompt, "2+2?");
        assert!(state.notice().unwrap().contains("broken"));
    }

    #[test]
    fn malformed_and_disconnect_surface_notices() {
        let mut state = playing("A");
        state.apply_event(ConnectionEvent::Malformed {
            error: "expected value".into(),
        });
        assert!(state.notice().unwrap().contains("expected value"));

        state.apply_event(ConnectionEvent::Disconnected {
            reason: Some("transport receive error: reset".into()),
        });
        assert!(matches!(
            state.connection(),
            ConnectionStatus::Disconnected { reason: Some(_) }
        ));
        assert!(state.notice().unwrap().starts_with("Disconnected"));
    }

    #[test]
    fn disconnected_game_no_longer_awaits_a_question() {
        let mut state = playing("A");
        assert!(state.awaiting_question());

        state.apply_event(ConnectionEvent::Disconnected { reason: None });
        assert_eq!(state.status(), GameStatus::Playing);
        assert!(!state.awaiting_question());
    }
}
