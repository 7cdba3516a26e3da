//! Writes a player makes on their own behalf: prompts, frames, submissions.
//!
//! Every action re-reads the game and is rejected unless the cursor still
//! matches the (round, phase) it was made for, so work finished after the
//! phase moved on is never recorded against the wrong round.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::game::MAX_PROMPT_CHARS;
use crate::domain::chain::current_animations;
use crate::domain::{FrameContent, Frame, Game, GameCursor, GameStatus, Phase};
use crate::errors::domain::{DomainError, NotFoundKind, ValidationKind};
use crate::services::transitions::ensure_round;
use crate::store::{GameStore, NewFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// The player pressed submit; content rules apply.
    Manual,
    /// The deadline fired; whatever exists is accepted.
    Deadline,
}

#[derive(Clone)]
pub struct PlayerActions {
    store: Arc<dyn GameStore>,
}

impl PlayerActions {
    pub fn new(store: Arc<dyn GameStore>) -> Self {
        Self { store }
    }

    pub async fn submit_prompt(
        &self,
        game_id: i64,
        round: i32,
        player_id: i64,
        text: &str,
        mode: SubmitMode,
    ) -> Result<(), DomainError> {
        self.require_turn(game_id, GameCursor::new(GameStatus::Prompt, round), player_id)
            .await?;

        let text = text.trim();
        if mode == SubmitMode::Manual && text.is_empty() {
            return Err(DomainError::validation(
                ValidationKind::EmptyPrompt,
                "Prompt cannot be empty",
            ));
        }
        if text.chars().count() > MAX_PROMPT_CHARS {
            return Err(DomainError::validation(
                ValidationKind::PromptTooLong,
                format!("Prompt must be at most {MAX_PROMPT_CHARS} characters"),
            ));
        }

        self.store
            .upsert_prompt(game_id, round, player_id, text)
            .await?;
        self.store
            .upsert_submission(game_id, round, player_id, Phase::Prompt)
            .await?;
        info!(game_id, round, player_id, ?mode, "prompt submitted");
        Ok(())
    }

    /// Append one autosave of a frame slot.
    pub async fn save_frame(
        &self,
        game_id: i64,
        round: i32,
        player_id: i64,
        frame_number: i16,
        image_data: String,
    ) -> Result<Frame, DomainError> {
        let game = self
            .require_turn(game_id, GameCursor::new(GameStatus::Drawing, round), player_id)
            .await?;
        if !(0..game.frames_per_round).contains(&frame_number) {
            return Err(DomainError::validation(
                ValidationKind::InvalidFrameNumber,
                format!(
                    "Frame number must be between 0 and {}",
                    game.frames_per_round - 1
                ),
            ));
        }

        let round_row = ensure_round(self.store.as_ref(), game_id, round).await?;
        let frame = self
            .store
            .insert_frame(
                game_id,
                NewFrame {
                    round_id: round_row.id,
                    player_id,
                    frame_number,
                    image_data,
                },
            )
            .await?;
        debug!(game_id, round, player_id, frame_number, "frame saved");
        Ok(frame)
    }

    pub async fn submit_drawing(
        &self,
        game_id: i64,
        round: i32,
        player_id: i64,
        mode: SubmitMode,
    ) -> Result<(), DomainError> {
        let game = self
            .require_turn(game_id, GameCursor::new(GameStatus::Drawing, round), player_id)
            .await?;

        if mode == SubmitMode::Manual {
            let frames = self.current_frames(game_id, round, player_id).await?;
            let complete = (0..game.frames_per_round).all(|slot| {
                frames
                    .iter()
                    .any(|f| f.frame_number == slot && is_drawn(&f.image_data))
            });
            if !complete {
                return Err(DomainError::validation(
                    ValidationKind::IncompleteDrawing,
                    format!("Draw all {} frames before submitting", game.frames_per_round),
                ));
            }
        }

        self.store
            .upsert_submission(game_id, round, player_id, Phase::Drawing)
            .await?;
        info!(game_id, round, player_id, ?mode, "drawing submitted");
        Ok(())
    }

    pub async fn has_submitted(
        &self,
        game_id: i64,
        round: i32,
        player_id: i64,
        phase: Phase,
    ) -> Result<bool, DomainError> {
        let submissions = self.store.list_submissions(game_id, round, phase).await?;
        Ok(submissions.iter().any(|s| s.player_id == player_id))
    }

    /// Latest content of each frame slot the player drew in `round`.
    pub async fn current_frames(
        &self,
        game_id: i64,
        round: i32,
        player_id: i64,
    ) -> Result<Vec<FrameContent>, DomainError> {
        let rounds = self.store.list_rounds(game_id, Some(round)).await?;
        let ids: Vec<i64> = rounds.iter().map(|r| r.id).collect();
        let frames = self.store.list_frames(&ids, Some(player_id)).await?;
        Ok(current_animations(&rounds, &frames)
            .remove(&(round, player_id))
            .unwrap_or_default())
    }

    async fn require_turn(
        &self,
        game_id: i64,
        expected: GameCursor,
        player_id: i64,
    ) -> Result<Game, DomainError> {
        let game = self.store.get_game(game_id).await?.ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Game, format!("Game {game_id} not found"))
        })?;
        if game.cursor() != expected {
            return Err(DomainError::validation(
                ValidationKind::WrongPhase,
                format!("Game is in {}, not {expected}", game.cursor()),
            ));
        }
        let roster = self.store.list_players(game_id).await?;
        if !roster.iter().any(|p| p.id == player_id) {
            return Err(DomainError::validation(
                ValidationKind::NotInGame,
                "You are not in this game",
            ));
        }
        Ok(game)
    }
}

/// Whether a saved frame holds a drawing. Blank canvases serialize as
/// whitespace, `[]` or `null`.
fn is_drawn(image_data: &str) -> bool {
    !matches!(image_data.trim(), "" | "[]" | "null")
}

#[derive(Debug, Default)]
struct SlotState {
    last_saved: Option<Instant>,
    pending: Option<String>,
}

/// Throttles incremental saves of one player's frames in one round.
pub struct FrameAutosaver {
    actions: PlayerActions,
    game_id: i64,
    round: i32,
    player_id: i64,
    interval: Duration,
    slots: Mutex<HashMap<i16, SlotState>>,
}

impl FrameAutosaver {
    pub fn new(
        actions: PlayerActions,
        game_id: i64,
        round: i32,
        player_id: i64,
        interval: Duration,
    ) -> Self {
        Self {
            actions,
            game_id,
            round,
            player_id,
            interval,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Remember the latest content of a slot and save it unless the slot was
    /// saved less than one interval ago. Returns whether a write happened.
    pub async fn record(&self, frame_number: i16, image_data: String) -> Result<bool, DomainError> {
        let due = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(frame_number).or_default();
            let now = Instant::now();
            let due = slot
                .last_saved
                .map_or(true, |at| now.duration_since(at) >= self.interval);
            if due {
                slot.last_saved = Some(now);
                slot.pending = None;
                Some(image_data)
            } else {
                slot.pending = Some(image_data);
                None
            }
        };

        match due {
            Some(data) => {
                self.save(frame_number, data).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write every pending slot now. Returns how many were written.
    pub async fn flush(&self) -> Result<usize, DomainError> {
        let pending: Vec<(i16, String)> = {
            let mut slots = self.slots.lock();
            let now = Instant::now();
            slots
                .iter_mut()
                .filter_map(|(&number, slot)| {
                    let data = slot.pending.take()?;
                    slot.last_saved = Some(now);
                    Some((number, data))
                })
                .collect()
        };

        for (frame_number, data) in &pending {
            self.save(*frame_number, data.clone()).await?;
        }
        Ok(pending.len())
    }

    async fn save(&self, frame_number: i16, image_data: String) -> Result<(), DomainError> {
        self.actions
            .save_frame(self.game_id, self.round, self.player_id, frame_number, image_data)
            .await
            .map(|_| ())
    }
}
