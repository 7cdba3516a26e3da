//! The shared state store every client coordinates through.
//!
//! There is no server: clients only read records, write their own records and
//! move the game cursor with compare-and-swap. Change notifications are a
//! best-effort hint layered on top; correctness never depends on them.

use async_trait::async_trait;

use crate::domain::{Frame, Game, GameCursor, GameStatus, Phase, Player, Prompt, Round, Submission};
use crate::errors::domain::DomainError;

pub mod feed;
pub mod redis_feed;
pub mod sea;

pub use feed::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream, LocalFeed};
pub use redis_feed::RedisFeed;
pub use sea::SeaStore;

#[derive(Debug, Clone)]
pub struct NewPlayer {
    pub game_id: i64,
    pub nickname: String,
    pub turn_order: i32,
    pub is_host: bool,
}

#[derive(Debug, Clone)]
pub struct NewFrame {
    pub round_id: i64,
    pub player_id: i64,
    pub frame_number: i16,
    pub image_data: String,
}

/// Target of a conditional cursor move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorUpdate {
    pub status: GameStatus,
    pub round: i32,
    /// Only the start action fixes the round count.
    pub total_rounds: Option<i32>,
}

impl CursorUpdate {
    pub fn to(cursor: GameCursor) -> Self {
        Self {
            status: cursor.status,
            round: cursor.round,
            total_rounds: None,
        }
    }

    pub fn with_total_rounds(mut self, total: i32) -> Self {
        self.total_rounds = Some(total);
        self
    }

    pub fn cursor(&self) -> GameCursor {
        GameCursor::new(self.status, self.round)
    }
}

#[async_trait]
pub trait GameStore: Send + Sync {
    async fn get_game(&self, game_id: i64) -> Result<Option<Game>, DomainError>;

    /// Exact match on the normalized room code.
    async fn find_game_by_room_code(&self, room_code: &str) -> Result<Option<Game>, DomainError>;

    /// Insert a game in the lobby at round 0.
    async fn insert_game(&self, room_code: &str, frames_per_round: i16) -> Result<Game, DomainError>;

    /// Move the cursor only if it still equals `expected`. `Ok(false)` when it did not.
    async fn compare_and_set_cursor(
        &self,
        game_id: i64,
        expected: GameCursor,
        update: CursorUpdate,
    ) -> Result<bool, DomainError>;

    /// Roster ordered by turn order.
    async fn list_players(&self, game_id: i64) -> Result<Vec<Player>, DomainError>;

    async fn insert_player(&self, new: NewPlayer) -> Result<Player, DomainError>;

    /// All round rows, or the rows of one round number, duplicates included.
    async fn list_rounds(
        &self,
        game_id: i64,
        round_number: Option<i32>,
    ) -> Result<Vec<Round>, DomainError>;

    async fn insert_round(&self, game_id: i64, round_number: i32) -> Result<Round, DomainError>;

    async fn upsert_prompt(
        &self,
        game_id: i64,
        round_number: i32,
        player_id: i64,
        text: &str,
    ) -> Result<(), DomainError>;

    async fn list_prompts(
        &self,
        game_id: i64,
        round_number: Option<i32>,
    ) -> Result<Vec<Prompt>, DomainError>;

    async fn insert_frame(&self, game_id: i64, new: NewFrame) -> Result<Frame, DomainError>;

    async fn list_frames(
        &self,
        round_ids: &[i64],
        player_id: Option<i64>,
    ) -> Result<Vec<Frame>, DomainError>;

    /// Idempotent: repeating a submission leaves one record.
    async fn upsert_submission(
        &self,
        game_id: i64,
        round_number: i32,
        player_id: i64,
        phase: Phase,
    ) -> Result<(), DomainError>;

    async fn list_submissions(
        &self,
        game_id: i64,
        round_number: i32,
        phase: Phase,
    ) -> Result<Vec<Submission>, DomainError>;

    /// Change hints for one game, when a feed is attached.
    fn subscribe(&self, game_id: i64) -> Option<ChangeStream>;
}
