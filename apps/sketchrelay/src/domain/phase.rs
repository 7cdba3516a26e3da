//! Game state machine: lobby -> prompt(1) -> drawing(1) -> ... -> drawing(N) -> complete.

use std::fmt;

use serde::Serialize;

use crate::entities::{GameStatus, Phase};

/// The `(status, current_round)` pair guarded by every conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GameCursor {
    pub status: GameStatus,
    pub round: i32,
}

impl GameCursor {
    pub const fn new(status: GameStatus, round: i32) -> Self {
        Self { status, round }
    }

    pub const fn lobby() -> Self {
        Self::new(GameStatus::Lobby, 0)
    }

    /// The submission phase collected in this state, if any.
    pub fn phase(&self) -> Option<Phase> {
        phase_of(self.status)
    }
}

impl fmt::Display for GameCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            GameStatus::Lobby => write!(f, "lobby"),
            GameStatus::Prompt => write!(f, "prompt({})", self.round),
            GameStatus::Drawing => write!(f, "drawing({})", self.round),
            GameStatus::Complete => write!(f, "complete"),
        }
    }
}

pub fn phase_of(status: GameStatus) -> Option<Phase> {
    match status {
        GameStatus::Prompt => Some(Phase::Prompt),
        GameStatus::Drawing => Some(Phase::Drawing),
        GameStatus::Lobby | GameStatus::Complete => None,
    }
}

/// Where a completed phase leads. `None` for states that are not advanced by quorum.
pub fn next_cursor(current: GameCursor, total_rounds: i32) -> Option<GameCursor> {
    match current.status {
        GameStatus::Prompt => Some(GameCursor::new(GameStatus::Drawing, current.round)),
        GameStatus::Drawing if current.round >= total_rounds => {
            Some(GameCursor::new(GameStatus::Complete, current.round))
        }
        GameStatus::Drawing => Some(GameCursor::new(GameStatus::Prompt, current.round + 1)),
        GameStatus::Lobby | GameStatus::Complete => None,
    }
}

/// Cursor set by the start action.
pub fn first_cursor() -> GameCursor {
    GameCursor::new(GameStatus::Prompt, 1)
}

/// Whether `later` is at or beyond `earlier` in the game's progression.
pub fn reached(later: GameCursor, earlier: GameCursor) -> bool {
    rank(later) >= rank(earlier)
}

fn rank(c: GameCursor) -> (u8, i32, u8) {
    match c.status {
        GameStatus::Lobby => (0, 0, 0),
        GameStatus::Prompt => (1, c.round, 0),
        GameStatus::Drawing => (1, c.round, 1),
        GameStatus::Complete => (2, 0, 0),
    }
}
