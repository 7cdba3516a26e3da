//! Records of the shared store as the rest of the crate sees them.

use serde::Serialize;
use time::OffsetDateTime;

use crate::domain::phase::GameCursor;
use crate::entities::{frames, games, players, prompts, rounds, submissions, GameStatus, Phase};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Game {
    pub id: i64,
    pub room_code: String,
    pub status: GameStatus,
    pub current_round: i32,
    pub total_rounds: i32,
    pub frames_per_round: i16,
    pub version: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Game {
    pub fn cursor(&self) -> GameCursor {
        GameCursor::new(self.status, self.current_round)
    }
}

impl From<games::Model> for Game {
    fn from(m: games::Model) -> Self {
        Self {
            id: m.id,
            room_code: m.room_code,
            status: m.status,
            current_round: m.current_round,
            total_rounds: m.total_rounds,
            frames_per_round: m.frames_per_round,
            version: m.version,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: i64,
    pub game_id: i64,
    pub nickname: String,
    pub turn_order: i32,
    pub is_host: bool,
}

impl From<players::Model> for Player {
    fn from(m: players::Model) -> Self {
        Self {
            id: m.id,
            game_id: m.game_id,
            nickname: m.nickname,
            turn_order: m.turn_order,
            is_host: m.is_host,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Round {
    pub id: i64,
    pub game_id: i64,
    pub round_number: i32,
    pub started_at: OffsetDateTime,
}

impl From<rounds::Model> for Round {
    fn from(m: rounds::Model) -> Self {
        Self {
            id: m.id,
            game_id: m.game_id,
            round_number: m.round_number,
            started_at: m.started_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub id: i64,
    pub game_id: i64,
    pub round_number: i32,
    pub player_id: i64,
    pub text: String,
    pub updated_at: OffsetDateTime,
}

impl From<prompts::Model> for Prompt {
    fn from(m: prompts::Model) -> Self {
        Self {
            id: m.id,
            game_id: m.game_id,
            round_number: m.round_number,
            player_id: m.player_id,
            text: m.text,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub id: i64,
    pub round_id: i64,
    pub player_id: i64,
    pub frame_number: i16,
    pub image_data: String,
    pub saved_at: OffsetDateTime,
}

impl From<frames::Model> for Frame {
    fn from(m: frames::Model) -> Self {
        Self {
            id: m.id,
            round_id: m.round_id,
            player_id: m.player_id,
            frame_number: m.frame_number,
            image_data: m.image_data,
            saved_at: m.saved_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: i64,
    pub game_id: i64,
    pub round_number: i32,
    pub player_id: i64,
    pub phase: Phase,
    pub submitted_at: OffsetDateTime,
}

impl From<submissions::Model> for Submission {
    fn from(m: submissions::Model) -> Self {
        Self {
            id: m.id,
            game_id: m.game_id,
            round_number: m.round_number,
            player_id: m.player_id,
            phase: m.phase,
            submitted_at: m.submitted_at,
        }
    }
}

/// Current content of one animation frame, ready for playback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameContent {
    pub frame_number: i16,
    pub image_data: String,
}
