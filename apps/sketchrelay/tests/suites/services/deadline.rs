//! Deadline driver: one automatic submission per expired phase.

use std::sync::Arc;
use std::time::Duration;

use sketchrelay::config::client::PhaseDurations;
use sketchrelay::domain::{GameCursor, GameStatus, Phase};
use sketchrelay::services::{DeadlineDriver, PlayerActions, SubmissionGate, SubmitMode};
use sketchrelay::store::GameStore;
use sketchrelay::AppError;
use tokio::time::timeout;

use crate::support::db::memory_store;
use crate::support::game_setup::{drawing_game, fast_policy, started_game, TestGame};
use crate::support::instrumented_store::InstrumentedStore;

fn short(prompt_ms: u64, drawing_ms: u64) -> PhaseDurations {
    PhaseDurations {
        prompt: Duration::from_millis(prompt_ms),
        drawing: Duration::from_millis(drawing_ms),
    }
}

fn driver_for(game: &TestGame, player: usize, durations: PhaseDurations) -> DeadlineDriver {
    DeadlineDriver::new(
        PlayerActions::new(game.store.clone()),
        SubmissionGate::default(),
        durations,
        fast_policy(),
        game.id(),
        game.players[player].id,
    )
}

/// Test: an expired prompt phase submits an empty prompt for the player
#[tokio::test]
async fn test_prompt_deadline_submits_empty_prompt() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let driver = driver_for(&game, 1, short(30, 5_000));
    let fired = driver.fired();

    assert!(driver.observe(game.game.cursor()));
    timeout(Duration::from_secs(5), fired.notified())
        .await
        .map_err(|_| AppError::internal("deadline never fired"))?;

    let me = game.players[1].id;
    let subs = game.store.list_submissions(game.id(), 1, Phase::Prompt).await?;
    assert_eq!(subs.iter().filter(|s| s.player_id == me).count(), 1);
    let prompts = game.store.list_prompts(game.id(), Some(1)).await?;
    assert!(prompts.iter().any(|p| p.player_id == me && p.text.is_empty()));
    Ok(())
}

/// Test: an expired drawing phase submits whatever frames exist
#[tokio::test]
async fn test_drawing_deadline_keeps_partial_frames() -> Result<(), AppError> {
    let game = drawing_game(memory_store().await?, 2, 5).await?;
    let me = game.players[0].id;
    let actions = PlayerActions::new(game.store.clone());
    actions.save_frame(game.id(), 1, me, 0, "data:0".into()).await?;

    let driver = driver_for(&game, 0, short(5_000, 30));
    let fired = driver.fired();
    assert!(driver.observe(GameCursor::new(GameStatus::Drawing, 1)));
    timeout(Duration::from_secs(5), fired.notified())
        .await
        .map_err(|_| AppError::internal("deadline never fired"))?;

    assert!(actions.has_submitted(game.id(), 1, me, Phase::Drawing).await?);
    assert_eq!(actions.current_frames(game.id(), 1, me).await?.len(), 1);
    Ok(())
}

/// Test: a player who already submitted is left alone
#[tokio::test]
async fn test_no_submission_after_manual_one() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let me = game.players[1].id;
    PlayerActions::new(game.store.clone())
        .submit_prompt(game.id(), 1, me, "a whale", SubmitMode::Manual)
        .await?;

    let driver = driver_for(&game, 1, short(20, 5_000));
    let fired = driver.fired();
    driver.observe(game.game.cursor());
    assert!(timeout(Duration::from_millis(300), fired.notified()).await.is_err());

    let prompts = game.store.list_prompts(game.id(), Some(1)).await?;
    let mine: Vec<_> = prompts.iter().filter(|p| p.player_id == me).collect();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].text, "a whale");
    Ok(())
}

/// Test: a locally claimed submission blocks the automatic one
#[tokio::test]
async fn test_claimed_gate_blocks_auto_submit() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let gate = SubmissionGate::default();
    assert!(gate.claim(1, Phase::Prompt));
    assert!(!gate.claim(1, Phase::Prompt));

    let driver = DeadlineDriver::new(
        PlayerActions::new(game.store.clone()),
        gate.clone(),
        short(20, 5_000),
        fast_policy(),
        game.id(),
        game.players[0].id,
    );
    let fired = driver.fired();
    driver.observe(game.game.cursor());
    assert!(timeout(Duration::from_millis(300), fired.notified()).await.is_err());
    assert!(game.store.list_submissions(game.id(), 1, Phase::Prompt).await?.is_empty());

    gate.release(1, Phase::Prompt);
    assert!(!gate.is_claimed(1, Phase::Prompt));
    Ok(())
}

/// Test: re-observing a phase keeps the original deadline
#[tokio::test]
async fn test_reobserve_does_not_restart() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let driver = driver_for(&game, 0, short(60_000, 60_000));
    let cursor = game.game.cursor();

    assert_eq!(driver.remaining(), None);
    assert!(driver.observe(cursor));
    let first = driver.remaining().ok_or_else(|| AppError::internal("not armed"))?;
    assert!(first <= Duration::from_secs(60));

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!driver.observe(cursor));
    let second = driver.remaining().ok_or_else(|| AppError::internal("not armed"))?;
    assert!(second < first);

    // A new phase re-arms with a full duration
    assert!(driver.observe(GameCursor::new(GameStatus::Drawing, 1)));
    let third = driver.remaining().ok_or_else(|| AppError::internal("not armed"))?;
    assert!(third > second);
    Ok(())
}

/// Test: leaving the playing phases disarms the deadline
#[tokio::test]
async fn test_non_phase_states_disarm() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let driver = driver_for(&game, 0, short(40, 40));
    let fired = driver.fired();

    driver.observe(game.game.cursor());
    assert!(!driver.observe(GameCursor::new(GameStatus::Complete, 2)));
    assert_eq!(driver.remaining(), None);
    assert!(timeout(Duration::from_millis(200), fired.notified()).await.is_err());
    assert!(game.store.list_submissions(game.id(), 1, Phase::Prompt).await?.is_empty());
    Ok(())
}

/// Test: an expired deadline for a phase the game already left writes nothing
#[tokio::test]
async fn test_stale_phase_is_ignored() -> Result<(), AppError> {
    let game = drawing_game(memory_store().await?, 2, 3).await?;
    let driver = driver_for(&game, 0, short(20, 5_000));
    let fired = driver.fired();

    // The client still believes it is in prompt(1)
    driver.observe(GameCursor::new(GameStatus::Prompt, 1));
    assert!(timeout(Duration::from_millis(300), fired.notified()).await.is_err());
    assert!(game
        .store
        .list_submissions(game.id(), 1, Phase::Drawing)
        .await?
        .is_empty());
    Ok(())
}

/// A started game whose driver writes through a fault-injecting store.
async fn flaky_driver(
    durations: PhaseDurations,
) -> Result<(TestGame, Arc<InstrumentedStore>, DeadlineDriver), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let store = InstrumentedStore::wrap(game.store.clone());
    let flaky: Arc<dyn GameStore> = store.clone();
    let driver = DeadlineDriver::new(
        PlayerActions::new(flaky),
        SubmissionGate::default(),
        durations,
        fast_policy(),
        game.id(),
        game.players[1].id,
    );
    Ok((game, store, driver))
}

/// Test: a transient store error during the automatic submission is retried
#[tokio::test]
async fn test_deadline_retries_transient_errors() -> Result<(), AppError> {
    let (game, store, driver) = flaky_driver(short(30, 5_000)).await?;
    store.fail_submission_reads_transiently(1);
    let fired = driver.fired();

    assert!(driver.observe(game.game.cursor()));
    timeout(Duration::from_secs(5), fired.notified())
        .await
        .map_err(|_| AppError::internal("deadline never fired"))?;

    let me = game.players[1].id;
    let subs = game.store.list_submissions(game.id(), 1, Phase::Prompt).await?;
    assert_eq!(subs.iter().filter(|s| s.player_id == me).count(), 1);
    Ok(())
}

/// Test: after retries run out, observing the phase again re-arms at once
#[tokio::test]
async fn test_failed_deadline_rearms_on_next_observe() -> Result<(), AppError> {
    let (game, store, driver) = flaky_driver(short(30, 5_000)).await?;
    // Every attempt the retry policy allows fails
    store.fail_submission_reads_transiently(fast_policy().max_attempts as usize);
    let fired = driver.fired();
    let cursor = game.game.cursor();

    assert!(driver.observe(cursor));
    assert!(timeout(Duration::from_millis(500), fired.notified()).await.is_err());
    let me = game.players[1].id;
    let subs = game.store.list_submissions(game.id(), 1, Phase::Prompt).await?;
    assert!(subs.iter().all(|s| s.player_id != me));

    assert!(driver.observe(cursor));
    assert_eq!(driver.remaining(), Some(Duration::ZERO));
    timeout(Duration::from_secs(5), fired.notified())
        .await
        .map_err(|_| AppError::internal("re-armed deadline never fired"))?;

    let subs = game.store.list_submissions(game.id(), 1, Phase::Prompt).await?;
    assert_eq!(subs.iter().filter(|s| s.player_id == me).count(), 1);
    Ok(())
}
