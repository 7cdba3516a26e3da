//! Phase transition coordinator: quorum-gated, single-winner cursor moves.

use std::sync::Arc;

use futures::future::join_all;
use sketchrelay::domain::{GameCursor, GameStatus, Phase};
use sketchrelay::services::transitions::ensure_round;
use sketchrelay::services::{AdvanceOutcome, PhaseCoordinator};
use sketchrelay::store::GameStore;
use sketchrelay::AppError;

use crate::support::db::memory_store;
use crate::support::game_setup::{fast_policy, lobby_with_players, started_game, TestGame};
use crate::support::instrumented_store::InstrumentedStore;

async fn submit_all(game: &TestGame, round: i32, phase: Phase) -> Result<(), AppError> {
    for p in &game.players {
        game.store
            .upsert_submission(game.id(), round, p.id, phase)
            .await?;
    }
    Ok(())
}

async fn cursor(store: &dyn GameStore, game_id: i64) -> Result<GameCursor, AppError> {
    Ok(store
        .get_game(game_id)
        .await?
        .ok_or_else(|| AppError::internal("game vanished"))?
        .cursor())
}

/// Test: nothing moves until every player submitted
#[tokio::test]
async fn test_waits_for_quorum() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 3, 3).await?;
    let coordinator = PhaseCoordinator::new(game.store.clone(), fast_policy());

    game.store
        .upsert_submission(game.id(), 1, game.players[0].id, Phase::Prompt)
        .await?;
    let outcome = coordinator.try_advance(game.id()).await?;
    match outcome {
        AdvanceOutcome::Waiting(report) => {
            assert_eq!(report.submitted_count, 1);
            assert_eq!(report.player_count, 3);
        }
        other => panic!("expected Waiting, got {other:?}"),
    }
    assert_eq!(
        cursor(game.store.as_ref(), game.id()).await?,
        GameCursor::new(GameStatus::Prompt, 1)
    );
    Ok(())
}

/// Test: the full state machine for a two-player game
#[tokio::test]
async fn test_walks_rounds_to_complete() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let coordinator = PhaseCoordinator::new(game.store.clone(), fast_policy());
    assert_eq!(game.game.total_rounds, 2);

    let expected = [
        (1, Phase::Prompt, GameCursor::new(GameStatus::Drawing, 1)),
        (1, Phase::Drawing, GameCursor::new(GameStatus::Prompt, 2)),
        (2, Phase::Prompt, GameCursor::new(GameStatus::Drawing, 2)),
        (2, Phase::Drawing, GameCursor::new(GameStatus::Complete, 2)),
    ];
    for (round, phase, target) in expected {
        submit_all(&game, round, phase).await?;
        let outcome = coordinator.try_advance(game.id()).await?;
        assert!(
            matches!(outcome, AdvanceOutcome::Advanced { to, .. } if to == target),
            "round {round} {phase:?}: {outcome:?}"
        );
        assert_eq!(cursor(game.store.as_ref(), game.id()).await?, target);
    }

    // Round 2 was opened by the drawing(1) -> prompt(2) move
    assert!(!game.store.list_rounds(game.id(), Some(2)).await?.is_empty());

    let done = coordinator.try_advance(game.id()).await?;
    assert!(matches!(done, AdvanceOutcome::NotActive(c) if c.status == GameStatus::Complete));
    Ok(())
}

/// Test: the lobby is never advanced by quorum
#[tokio::test]
async fn test_lobby_is_not_active() -> Result<(), AppError> {
    let game = lobby_with_players(memory_store().await?, 2, 3).await?;
    let coordinator = PhaseCoordinator::new(game.store.clone(), fast_policy());
    let outcome = coordinator.try_advance(game.id()).await?;
    assert_eq!(outcome, AdvanceOutcome::NotActive(GameCursor::lobby()));
    Ok(())
}

/// Test: K racing coordinators produce exactly one cursor move, K in 1..=20
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_transition_under_contention() -> Result<(), AppError> {
    for k in 1..=20usize {
        let game = started_game(memory_store().await?, 3, 3).await?;
        submit_all(&game, 1, Phase::Prompt).await?;

        let store = InstrumentedStore::wrap(game.store.clone());
        let shared: Arc<dyn GameStore> = store.clone();
        let game_id = game.id();

        let racers = (0..k).map(|_| {
            let coordinator = PhaseCoordinator::new(shared.clone(), fast_policy());
            tokio::spawn(async move { coordinator.try_advance(game_id).await })
        });
        let mut outcomes: Vec<AdvanceOutcome> = Vec::with_capacity(k);
        for joined in join_all(racers).await {
            outcomes.push(joined.map_err(|e| AppError::internal(e.to_string()))??);
        }

        assert_eq!(store.applied(), 1, "k={k}: exactly one CAS applies");
        let winners = outcomes
            .iter()
            .filter(|o| matches!(o, AdvanceOutcome::Advanced { .. }))
            .count();
        assert_eq!(winners, 1, "k={k}: {outcomes:?}");
        // Late racers either see the move or find drawing(1) still open
        assert!(
            outcomes.iter().all(|o| o.moved()
                || matches!(o, AdvanceOutcome::Waiting(r) if r.phase == Phase::Drawing && r.round_number == 1)),
            "k={k}: {outcomes:?}"
        );
        assert_eq!(
            cursor(shared.as_ref(), game_id).await?,
            GameCursor::new(GameStatus::Drawing, 1)
        );
    }
    Ok(())
}

/// Test: racing round creation settles on one authoritative row
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ensure_round() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let game_id = game.id();

    let ensures = (0..8).map(|_| {
        let store = game.store.clone();
        tokio::spawn(async move { ensure_round(store.as_ref(), game_id, 2).await })
    });
    for joined in join_all(ensures).await {
        let round = joined.map_err(|e| AppError::internal(e.to_string()))??;
        assert_eq!(round.round_number, 2);
    }

    // Whatever duplicates exist, every later caller agrees on the same row
    let a = ensure_round(game.store.as_ref(), game_id, 2).await?;
    let b = ensure_round(game.store.as_ref(), game_id, 2).await?;
    assert_eq!(a.id, b.id);
    Ok(())
}
