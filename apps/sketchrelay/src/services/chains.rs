//! Loading the finished chains of a completed game.

use tracing::debug;

use crate::domain::chain::{reconstruct_chains, Chain, ChainInputs};
use crate::domain::GameStatus;
use crate::errors::domain::{DomainError, NotFoundKind, ValidationKind};
use crate::store::GameStore;

pub async fn load_chains(store: &dyn GameStore, game_id: i64) -> Result<Vec<Chain>, DomainError> {
    let game = store.get_game(game_id).await?.ok_or_else(|| {
        DomainError::not_found(NotFoundKind::Game, format!("Game {game_id} not found"))
    })?;
    if game.status != GameStatus::Complete {
        return Err(DomainError::validation(
            ValidationKind::WrongPhase,
            format!("Chains are available once the game is complete (now {})", game.cursor()),
        ));
    }

    let players = store.list_players(game_id).await?;
    let rounds = store.list_rounds(game_id, None).await?;
    let prompts = store.list_prompts(game_id, None).await?;
    let round_ids: Vec<i64> = rounds.iter().map(|r| r.id).collect();
    let frames = store.list_frames(&round_ids, None).await?;

    debug!(
        game_id,
        players = players.len(),
        rounds = rounds.len(),
        prompts = prompts.len(),
        frames = frames.len(),
        "reconstructing chains"
    );

    Ok(reconstruct_chains(ChainInputs {
        players: &players,
        rounds: &rounds,
        prompts: &prompts,
        frames: &frames,
        total_rounds: game.total_rounds,
    }))
}
