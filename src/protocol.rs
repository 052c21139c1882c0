//! Wire types for the Knowledge Battle real-time protocol.
//!
//! Every frame is a single JSON text message naming the event and carrying
//! its payload under `data`:
//!
//! ```text
//! {"event":"game_start","data":[{"id":"A","score":0},{"id":"B","score":0}]}
//! {"event":"point_awarded"}
//! {"event":"submit_answer","data":"4"}
//! ```
//!
//! Event names are the wire contract and are kept verbatim, including the
//! hyphenated `new-question`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriviaError};

/// Opaque connection identifier assigned by the server.
pub type PlayerId = String;

/// Minimum number of options a question must offer.
pub const MIN_OPTIONS: usize = 2;

// ── Payloads ────────────────────────────────────────────────────────

/// A player and their current score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub score: u32,
}

impl Player {
    /// Create a player entry.
    pub fn new(id: impl Into<PlayerId>, score: u32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Text shown to the player.
    #[serde(rename = "question")]
    pub prompt: String,
    /// Choices in display order.
    pub options: Vec<String>,
}

impl Question {
    /// Create a question from a prompt and its options.
    pub fn new<I, S>(prompt: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prompt: prompt.into(),
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `choice` is one of this question's options.
    pub fn has_option(&self, choice: &str) -> bool {
        self.options.iter().any(|opt| opt == choice)
    }

    /// Reject questions that cannot be answered meaningfully.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::InvalidPayload`] if fewer than
    /// [`MIN_OPTIONS`] choices are offered.
    pub fn validate(&self) -> Result<()> {
        if self.options.len() < MIN_OPTIONS {
            return Err(TriviaError::InvalidPayload(format!(
                "question {:?} has {} option(s), expected at least {MIN_OPTIONS}",
                self.prompt,
                self.options.len()
            )));
        }
        Ok(())
    }
}

/// Payload of the transport-level `connect` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectPayload {
    /// Identifier the server assigned to this connection.
    pub id: PlayerId,
}

/// Reject rosters with an unnamed player or the same player twice.
///
/// # Errors
///
/// Returns [`TriviaError::InvalidPayload`] naming the first offending id.
pub fn validate_roster(players: &[Player]) -> Result<()> {
    let mut seen = HashSet::with_capacity(players.len());
    for player in players {
        if player.id.is_empty() {
            return Err(TriviaError::InvalidPayload(
                "roster lists a player with an empty id".into(),
            ));
        }
        if !seen.insert(player.id.as_str()) {
            return Err(TriviaError::InvalidPayload(format!(
                "roster lists player {:?} more than once",
                player.id
            )));
        }
    }
    Ok(())
}

// ── Messages ────────────────────────────────────────────────────────

/// Events sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMessage {
    /// Ask to be matched into a game. Sent once the connection is up.
    #[serde(rename = "join_game")]
    JoinGame,
    /// Answer the active question with one of its options.
    #[serde(rename = "submit_answer")]
    SubmitAnswer(String),
    /// Ask for a fresh game after game over.
    #[serde(rename = "restart_game")]
    RestartGame,
}

impl ClientMessage {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::JoinGame => "join_game",
            Self::SubmitAnswer(_) => "submit_answer",
            Self::RestartGame => "restart_game",
        }
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::Serialization`] if encoding fails.
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Events sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Connection established; carries this client's identifier.
    #[serde(rename = "connect")]
    Connect(ConnectPayload),
    /// Match found; carries the initial roster.
    #[serde(rename = "game_start")]
    GameStart(Vec<Player>),
    /// Next question to display.
    #[serde(rename = "new-question")]
    NewQuestion(Question),
    /// Full roster with updated scores.
    #[serde(rename = "score_update")]
    ScoreUpdate(Vec<Player>),
    /// The last submitted answer was correct.
    #[serde(rename = "point_awarded")]
    PointAwarded,
    /// The last submitted answer was wrong.
    #[serde(rename = "wrong_answer")]
    WrongAnswer,
    /// The game ended; carries the winner's identifier.
    #[serde(rename = "game_over")]
    GameOver(PlayerId),
}

impl ServerMessage {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect(_) => "connect",
            Self::GameStart(_) => "game_start",
            Self::NewQuestion(_) => "new-question",
            Self::ScoreUpdate(_) => "score_update",
            Self::PointAwarded => "point_awarded",
            Self::WrongAnswer => "wrong_answer",
            Self::GameOver(_) => "game_over",
        }
    }

    /// Check the payload beyond what deserialization guarantees.
    ///
    /// # Errors
    ///
    /// Returns [`TriviaError::InvalidPayload`] for questions with too few
    /// options, rosters with duplicate ids, and empty identifiers.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Connect(payload) if payload.id.is_empty() => Err(TriviaError::InvalidPayload(
                "connect carried an empty id".into(),
            )),
            Self::GameOver(winner) if winner.is_empty() => Err(TriviaError::InvalidPayload(
                "game_over carried an empty winner id".into(),
            )),
            Self::GameStart(players) | Self::ScoreUpdate(players) => validate_roster(players),
            Self::NewQuestion(question) => question.validate(),
            _ => Ok(()),
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

    #[test]
    fn question_uses_question_field_on_the_wire() {
        let json = r#"{"event":"new-question","data":{"question":"2+2?","options":["3","4","5"]}}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::NewQuestion(q) = msg else {
            panic!("expected NewQuestion, got {msg:?}");
        };
        assert_eq!(q.prompt, "2+2?");
        assert_eq!(q.options, vec!["3", "4", "5"]);
    }

    #[test]
    fn unit_events_have_no_data() {
        let msg: ServerMessage = serde_json::from_str(r#"{"event":"point_awarded"}"#).unwrap();
        assert_eq!(msg, ServerMessage::PointAwarded);
        assert_eq!(
            serde_json::to_string(&ClientMessage::JoinGame).unwrap(),
            r#"{"event":"join_game"}"#
        );
    }

    #[test]
    fn submit_answer_carries_choice_as_data() {
        let json = serde_json::to_string(&ClientMessage::SubmitAnswer("4".into())).unwrap();
        assert_eq!(json, r#"{"event":"submit_answer","data":"4"}"#);
    }

    #[test]
    fn game_over_carries_winner_id() {
        let msg: ServerMessage =
            serde_json::from_str(r#"{"event":"game_over","data":"B"}"#).unwrap();
        assert_eq!(msg, ServerMessage::GameOver("B".into()));
    }

    #[test]
    fn negative_score_is_rejected_by_the_parser() {
        let json = r#"{"event":"score_update","data":[{"id":"A","score":-1}]}"#;
        assert!(serde_json::from_str::<ServerMessage>(json).is_err());
    }

    #[test]
    fn names_match_serialized_tags() {
        let samples = [
            ServerMessage::Connect(ConnectPayload { id: "A".into() }),
            ServerMessage::GameStart(vec![]),
            ServerMessage::NewQuestion(Question::new("q", ["a", "b"])),
            ServerMessage::ScoreUpdate(vec![]),
            ServerMessage::PointAwarded,
            ServerMessage::WrongAnswer,
            ServerMessage::GameOver("A".into()),
        ];
        for msg in samples {
            let value = serde_json::to_value(&msg).unwrap();
            assert_eq!(value["event"], msg.name());
        }
    }

    #[test]
    fn single_option_question_is_invalid() {
        let msg = ServerMessage::NewQuestion(Question::new("only one?", ["yes"]));
        assert!(matches!(msg.validate(), Err(TriviaError::InvalidPayload(_))));
    }

    #[test]
    fn duplicate_roster_ids_are_invalid() {
        let roster = vec![Player::new("A", 1), Player::new("A", 2)];
        assert!(validate_roster(&roster).is_err());
        assert!(ServerMessage::ScoreUpdate(roster).validate().is_err());
    }

    #[test]
    fn unnamed_roster_player_is_invalid() {
        let frame = r#"{"event":"score_update","data":[{"id":"","score":0}]}"#;
        let msg: ServerMessage = serde_json::from_str(frame).unwrap();
        assert!(matches!(msg.validate(), Err(TriviaError::InvalidPayload(_))));
    }

    #[test]
    fn to_frame_produces_the_wire_text() {
        assert_eq!(
            ClientMessage::RestartGame.to_frame().unwrap(),
            r#"{"event":"restart_game"}"#
        );
        assert_eq!(
            ClientMessage::SubmitAnswer("4".into()).to_frame().unwrap(),
            r#"{"event":"submit_answer","data":"4"}"#
        );
    }

    #[test]
    fn empty_roster_is_valid() {
        assert!(ServerMessage::ScoreUpdate(vec![]).validate().is_ok());
    }

    #[test]
    fn has_option_matches_exactly() {
        let q = Question::new("2+2?", ["3", "4"]);
        assert!(q.has_option("4"));
        assert!(!q.has_option("4 "));
    }
}
