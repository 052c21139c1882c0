//! Game-over screen.

use std::fmt;

/// How the game ended for this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
}

impl Outcome {
    pub fn headline(self) -> &'static str {
        match self {
            Self::Won => "You Win!",
            Self::Lost => "You Lost!",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Won => "Congratulations! Your knowledge has led you to victory.",
            Self::Lost => "Nice try! Keep learning and you'll win next time.",
        }
    }

    fn emblem(self) -> &'static str {
        match self {
            Self::Won => "🏆",
            Self::Lost => "🧠",
        }
    }
}

/// Final result plus the way back to the lobby.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameOverView {
    pub outcome: Outcome,
    pub action: &'static str,
}

impl GameOverView {
    /// A client that never learned its own id cannot have won.
    pub fn new(winner: &str, self_id: Option<&str>) -> Self {
        let outcome = if self_id == Some(winner) {
            Outcome::Won
        } else {
            Outcome::Lost
        };
        Self {
            outcome,
            action: "Play Again",
        }
    }
}

impl fmt::Display for GameOverView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", self.outcome.emblem(), self.outcome.headline())?;
        writeln!(f, "{}", self.outcome.message())?;
        writeln!(f)?;
        writeln!(f, "[r] {}", self.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_winner_means_lost() {
        let view = GameOverView::new("B", Some("A"));
        assert_eq!(view.outcome, Outcome::Lost);
        assert!(view.to_string().contains("You Lost!"));
    }

    #[test]
    fn own_id_means_won() {
        let view = GameOverView::new("A", Some("A"));
        assert_eq!(view.outcome, Outcome::Won);
        assert!(view.to_string().contains("Congratulations!"));
    }

    #[test]
    fn unknown_identity_means_lost() {
        assert_eq!(GameOverView::new("A", None).outcome, Outcome::Lost);
    }
}
