//! Builders for games in a known state.

use std::sync::Arc;
use std::time::Duration;

use sketchrelay::config::client::{ClientTuning, PhaseDurations};
use sketchrelay::domain::{Game, Player};
use sketchrelay::services::retry::RetryPolicy;
use sketchrelay::services::{AdvanceOutcome, Lobby, PhaseCoordinator, PlayerActions, SubmitMode};
use sketchrelay::store::GameStore;
use sketchrelay::AppError;

pub const NAMES: [&str; 10] = [
    "Ada", "Bo", "Cy", "Di", "Ed", "Flo", "Gus", "Hal", "Ida", "Jo",
];

/// Millisecond backoff so retry paths stay fast.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(4, Duration::from_millis(2), Duration::from_millis(10))
}

pub fn fast_tuning(prompt: Duration, drawing: Duration) -> ClientTuning {
    ClientTuning {
        poll_interval: Duration::from_millis(20),
        retry: fast_policy(),
        durations: PhaseDurations { prompt, drawing },
        autosave_interval: Duration::from_millis(5),
    }
}

pub struct TestGame {
    pub store: Arc<dyn GameStore>,
    pub game: Game,
    /// In turn order; the first is the host.
    pub players: Vec<Player>,
}

impl TestGame {
    pub fn id(&self) -> i64 {
        self.game.id
    }

    pub fn host(&self) -> &Player {
        &self.players[0]
    }

    pub fn lobby(&self) -> Lobby {
        Lobby::new(self.store.clone(), fast_policy())
    }

    pub async fn reload(&mut self) -> Result<&Game, AppError> {
        self.game = self
            .store
            .get_game(self.game.id)
            .await?
            .ok_or_else(|| AppError::internal("game vanished"))?;
        Ok(&self.game)
    }
}

/// A lobby with `n` players named from [`NAMES`].
pub async fn lobby_with_players(
    store: Arc<dyn GameStore>,
    n: usize,
    frames_per_round: i16,
) -> Result<TestGame, AppError> {
    let lobby = Lobby::new(store.clone(), fast_policy());
    let created = lobby.create_game(NAMES[0], frames_per_round).await?;
    let mut players = vec![created.host];
    for name in NAMES.iter().take(n).skip(1) {
        let joined = lobby.join_game(&created.game.room_code, name).await?;
        players.push(joined.player);
    }
    Ok(TestGame {
        store,
        game: created.game,
        players,
    })
}

/// A game with `n` players, started and sitting in prompt(1).
pub async fn started_game(
    store: Arc<dyn GameStore>,
    n: usize,
    frames_per_round: i16,
) -> Result<TestGame, AppError> {
    let mut game = lobby_with_players(store, n, frames_per_round).await?;
    game.lobby().start_game(game.id(), game.host().id).await?;
    game.reload().await?;
    Ok(game)
}

/// A started game moved on to drawing(1); every player wrote `"prompt <nickname>"`.
pub async fn drawing_game(
    store: Arc<dyn GameStore>,
    n: usize,
    frames_per_round: i16,
) -> Result<TestGame, AppError> {
    let mut game = started_game(store, n, frames_per_round).await?;
    let actions = PlayerActions::new(game.store.clone());
    for p in &game.players {
        let text = format!("prompt {}", p.nickname);
        actions
            .submit_prompt(game.id(), 1, p.id, &text, SubmitMode::Manual)
            .await?;
    }
    let outcome = PhaseCoordinator::new(game.store.clone(), fast_policy())
        .try_advance(game.id())
        .await?;
    if !matches!(outcome, AdvanceOutcome::Advanced { .. }) {
        return Err(AppError::internal(format!("expected to advance, got {outcome:?}")));
    }
    game.reload().await?;
    Ok(game)
}
