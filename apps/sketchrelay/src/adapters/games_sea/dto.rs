//! DTOs for the games adapter.

use crate::entities::GameStatus;

/// Insert a game in the lobby.
#[derive(Debug, Clone)]
pub struct GameCreate {
    pub room_code: String,
    pub frames_per_round: i16,
}

/// Conditional cursor move: applies only while the stored
/// `(status, current_round)` still equals the expected pair.
#[derive(Debug, Clone)]
pub struct GameCursorSwap {
    pub id: i64,
    pub expected_status: GameStatus,
    pub expected_round: i32,
    pub next_status: GameStatus,
    pub next_round: i32,
    /// Set once, by the start action.
    pub total_rounds: Option<i32>,
}
