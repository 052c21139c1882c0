//! The question area of the playing screen.

use std::fmt;

use crate::state::{Feedback, GameState};

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionButton {
    /// 1-based shortcut shown next to the option.
    pub key: usize,
    pub label: String,
}

/// What the question area shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionPanel {
    /// A question is active.
    Question {
        prompt: String,
        options: Vec<OptionButton>,
        feedback: Option<Feedback>,
        /// An answer went out and the buttons are spent.
        answered: bool,
    },
    /// The loading delay passed with no question.
    Loading,
    /// The game started; the first question is on its way.
    Waiting,
}

impl QuestionPanel {
    pub fn new(state: &GameState) -> Self {
        match state.question() {
            Some(question) => Self::Question {
                prompt: question.prompt.clone(),
                options: question
                    .options
                    .iter()
                    .enumerate()
                    .map(|(index, label)| OptionButton {
                        key: index + 1,
                        label: label.clone(),
                    })
                    .collect(),
                feedback: state.feedback(),
                answered: state.has_answered(),
            },
            None if state.is_loading() => Self::Loading,
            None => Self::Waiting,
        }
    }

    /// Label of the option bound to `key`, if any.
    pub fn option_for_key(&self, key: usize) -> Option<&str> {
        match self {
            Self::Question { options, .. } => options
                .iter()
                .find(|button| button.key == key)
                .map(|button| button.label.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Question {
                prompt,
                options,
                feedback,
                answered,
            } => {
                writeln!(f, "{prompt}")?;
                for button in options {
                    writeln!(f, "  [{}] {}", button.key, button.label)?;
                }
                match feedback {
                    Some(feedback) => writeln!(f, "{}", feedback.message()),
                    None if *answered => writeln!(f, "Answer sent, waiting for the verdict..."),
                    None => Ok(()),
                }
            }
            Self::Loading => writeln!(f, "Loading next question..."),
            Self::Waiting => writeln!(f, "🧠 Get ready for the next question!"),
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

    fn playing() -> GameState {
        let mut state = GameState::new();
        state.apply(ServerMessage::Connect(ConnectPayload { id: "A".into() }));
        state.apply(ServerMessage::GameStart(vec![
            Player::new("A", 0),
            Player::new("B", 0),
        ]));
        state
    }

    #[test]
    fn waiting_before_first_question() {
        assert_eq!(QuestionPanel::new(&playing()), QuestionPanel::Waiting);
    }

    #[test]
    fn loading_after_delay() {
        let mut state = playing();
        state.loading_elapsed();
        let panel = QuestionPanel::new(&state);
        assert_eq!(panel, QuestionPanel::Loading);
        assert!(panel.to_string().contains("Loading next question..."));
    }

    #[test]
    fn question_while_loading_shows_three_buttons() {
        let mut state = playing();
        state.loading_elapsed();
        state.apply(ServerMessage::NewQuestion(Question::new("2+2?", ["3", "4", "5"])));

        let panel = QuestionPanel::new(&state);
        let QuestionPanel::Question { options, .. } = &panel else {
            panic!("expected a question, got {panel:?}");
        };
        assert_eq!(options.len(), 3);
        assert_eq!(panel.option_for_key(2), Some("4"));
        assert_eq!(panel.option_for_key(4), None);
    }

    #[test]
    fn feedback_is_rendered() {
        let mut state = playing();
        state.apply(ServerMessage::NewQuestion(Question::new("2+2?", ["3", "4"])));
        state.apply(ServerMessage::PointAwarded);
        assert!(QuestionPanel::new(&state).to_string().contains("Correct!"));
    }
}
