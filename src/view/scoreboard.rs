//! Scoreboard: the roster ranked by score.

use std::fmt;

use crate::state::GameState;

/// Score at which the bar is full.
const FULL_BAR_SCORE: u32 = 10;
const BAR_WIDTH: usize = 20;

/// One ranked player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRow {
    /// 1-based position after sorting.
    pub rank: usize,
    /// "You" for this client, "Opponent" otherwise.
    pub label: &'static str,
    pub is_self: bool,
    /// First place, only marked when there is someone to lead.
    pub is_leading: bool,
    pub score: u32,
    /// Progress bar fill, 0 to 100.
    pub bar_percent: u8,
}

/// The ranked roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreboardView {
    pub rows: Vec<ScoreRow>,
}

impl ScoreboardView {
    /// Rank the roster. Sorting happens here on every render; the stored
    /// roster keeps the server's order.
    pub fn new(state: &GameState) -> Self {
        let contested = state.players().len() > 1;
        let rows = state
            .ranked_players()
            .into_iter()
            .enumerate()
            .map(|(index, player)| {
                let is_self = state.is_self(&player.id);
                ScoreRow {
                    rank: index + 1,
                    label: if is_self { "You" } else { "Opponent" },
                    is_self,
                    is_leading: index == 0 && contested,
                    score: player.score,
                    bar_percent: bar_percent(player.score),
                }
            })
            .collect();
        Self { rows }
    }
}

fn bar_percent(score: u32) -> u8 {
    // Bounded by the min, so the cast cannot truncate.
    (score.saturating_mul(100) / FULL_BAR_SCORE).min(100) as u8
}

impl fmt::Display for ScoreboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scoreboard")?;
        for row in &self.rows {
            let filled = usize::from(row.bar_percent) * BAR_WIDTH / 100;
            let crown = if row.is_leading { " 👑" } else { "" };
            writeln!(
                f,
                "{}. {:<8}{crown:<3} {:>3} pts [{}{}]",
                row.rank,
                row.label,
                row.score,
                "#".repeat(filled),
                "-".repeat(BAR_WIDTH - filled),
            )?;
        }
        Ok(())
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
    use crate::protocol::{ConnectPayload, Player, ServerMessage};

    fn board(self_id: &str, roster: Vec<Player>) -> ScoreboardView {
        let mut state = GameState::new();
        state.apply(ServerMessage::Connect(ConnectPayload {
            id: self_id.into(),
        }));
        state.apply(ServerMessage::GameStart(roster));
        ScoreboardView::new(&state)
    }

    #[test]
    fn tie_keeps_server_order_with_self_first() {
        let view = board("A", vec![Player::new("A", 0), Player::new("B", 0)]);
        assert_eq!(view.rows[0].label, "You");
        assert_eq!(view.rows[1].label, "Opponent");
        assert!(view.rows[0].is_leading);
    }

    #[test]
    fn higher_score_ranks_first() {
        let view = board("A", vec![Player::new("A", 1), Player::new("B", 4)]);
        assert_eq!(view.rows[0].label, "Opponent");
        assert_eq!(view.rows[0].rank, 1);
        assert_eq!(view.rows[1].label, "You");
        assert_eq!(view.rows[1].rank, 2);
    }

    #[test]
    fn lone_player_is_not_leading() {
        let view = board("A", vec![Player::new("A", 3)]);
        assert!(!view.rows[0].is_leading);
    }

    #[test]
    fn bar_is_ten_percent_per_point_capped() {
        assert_eq!(bar_percent(0), 0);
        assert_eq!(bar_percent(3), 30);
        assert_eq!(bar_percent(10), 100);
        assert_eq!(bar_percent(25), 100);
        assert_eq!(bar_percent(u32::MAX), 100);
    }

    #[test]
    fn renders_one_line_per_player() {
        let text = board("A", vec![Player::new("A", 2), Player::new("B", 7)]).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Scoreboard");
        assert!(lines[1].starts_with("1. Opponent"));
        assert!(lines[1].contains("7 pts"));
        assert!(lines[2].starts_with("2. You"));
    }
}
