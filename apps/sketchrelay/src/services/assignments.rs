//! The current task of one player, with everything needed to perform it.

use serde::Serialize;

use crate::domain::assignment::{assignment_for, Assignment};
use crate::domain::chain::current_animations;
use crate::domain::latest::latest_by_key;
use crate::domain::quorum::count_quorum;
use crate::domain::rotation::ring;
use crate::domain::{FrameContent, GameCursor};
use crate::errors::domain::{DomainError, NotFoundKind, ValidationKind};
use crate::store::GameStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskDetail {
    Lobby,
    WritePrompt {
        round: i32,
        /// What this player drew last round, to be captioned. `None` in round 1.
        previous_animation: Option<Vec<FrameContent>>,
    },
    Draw {
        round: i32,
        prompt_author_id: i64,
        prompt_author: String,
        /// `None` when the author never wrote one.
        prompt: Option<String>,
    },
    Complete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskView {
    pub game_id: i64,
    pub player_id: i64,
    pub cursor: GameCursor,
    pub frames_per_round: i16,
    pub detail: TaskDetail,
    pub already_submitted: bool,
    /// `(submitted, players)` for the current phase.
    pub progress: Option<(usize, usize)>,
}

pub async fn load_task(
    store: &dyn GameStore,
    game_id: i64,
    player_id: i64,
) -> Result<TaskView, DomainError> {
    let game = store.get_game(game_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Game, format!("Game {game_id} not found"))
    })?;
    let cursor = game.cursor();
    let ring = ring(&store.list_players(game_id).await?);

    let assignment = assignment_for(cursor, &ring, player_id).ok_or_else(|| {
        DomainError::validation(ValidationKind::NotInGame, "You are not in this game")
    })?;

    let detail = match assignment {
        Assignment::Lobby => TaskDetail::Lobby,
        Assignment::Complete => TaskDetail::Complete,
        Assignment::WritePrompt {
            round,
            caption_of_round,
        } => {
            let previous_animation = match caption_of_round {
                Some(previous) => {
                    let rounds = store.list_rounds(game_id, Some(previous)).await?;
                    let ids: Vec<i64> = rounds.iter().map(|r| r.id).collect();
                    let frames = store.list_frames(&ids, Some(player_id)).await?;
                    Some(
                        current_animations(&rounds, &frames)
                            .remove(&(previous, player_id))
                            .unwrap_or_default(),
                    )
                }
                None => None,
            };
            TaskDetail::WritePrompt {
                round,
                previous_animation,
            }
        }
        Assignment::Draw {
            round,
            prompt_author_id,
        } => {
            let prompts = store.list_prompts(game_id, Some(round)).await?;
            let prompt = latest_by_key(
                prompts.into_iter().filter(|p| p.player_id == prompt_author_id),
                |p| p.player_id,
            )
            .remove(&prompt_author_id)
            .map(|p| p.text);
            let prompt_author = ring
                .iter()
                .find(|p| p.id == prompt_author_id)
                .map(|p| p.nickname.clone())
                .unwrap_or_default();
            TaskDetail::Draw {
                round,
                prompt_author_id,
                prompt_author,
                prompt,
            }
        }
    };

    let (already_submitted, progress) = match cursor.phase() {
        Some(phase) => {
            let submissions = store.list_submissions(game_id, cursor.round, phase).await?;
            let count = count_quorum(&ring, submissions.iter().map(|s| s.player_id));
            (
                count.submitted.contains(&player_id),
                Some((count.submitted.len(), count.player_count)),
            )
        }
        None => (false, None),
    };

    Ok(TaskView {
        game_id,
        player_id,
        cursor,
        frames_per_round: game.frames_per_round,
        detail,
        already_submitted,
        progress,
    })
}
