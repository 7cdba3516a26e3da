//! What one player must do in the current game state.

use serde::Serialize;

use crate::domain::model::Player;
use crate::domain::phase::GameCursor;
use crate::domain::rotation::{prompt_source_for, ring_index};
use crate::entities::GameStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Assignment {
    Lobby,
    /// Round 1 starts a chain; later rounds caption the animation this
    /// player drew in `round - 1`.
    WritePrompt { round: i32, caption_of_round: Option<i32> },
    /// Illustrate the prompt the ring predecessor wrote this round.
    Draw { round: i32, prompt_author_id: i64 },
    Complete,
}

/// `None` when `player_id` is not on the ring.
pub fn assignment_for(cursor: GameCursor, ring: &[Player], player_id: i64) -> Option<Assignment> {
    let me = ring_index(ring, player_id)?;
    let assignment = match cursor.status {
        GameStatus::Lobby => Assignment::Lobby,
        GameStatus::Complete => Assignment::Complete,
        GameStatus::Prompt => Assignment::WritePrompt {
            round: cursor.round,
            caption_of_round: (cursor.round > 1).then(|| cursor.round - 1),
        },
        GameStatus::Drawing => {
            let source = prompt_source_for(me, ring.len())?;
            Assignment::Draw {
                round: cursor.round,
                prompt_author_id: ring[source].id,
            }
        }
    };
    Some(assignment)
}
