//! Chain reconstruction over stored games.

use sketchrelay::errors::domain::{DomainError, NotFoundKind, ValidationKind};
use sketchrelay::services::chains::load_chains;
use sketchrelay::services::transitions::ensure_round;
use sketchrelay::store::NewFrame;
use sketchrelay::AppError;

use crate::support::db::memory_store;
use crate::support::game_setup::started_game;
use crate::support::play::{frame_data, play_phase, play_to_completion, prompt_text};

/// Test: the chain of each origin walks the ring one step per round
#[tokio::test]
async fn test_three_player_ring_walk() -> Result<(), AppError> {
    let mut game = started_game(memory_store().await?, 3, 3).await?;
    play_to_completion(&mut game, &[]).await?;

    let chains = load_chains(game.store.as_ref(), game.id()).await?;
    assert_eq!(chains.len(), 3);

    let names: Vec<&str> = game.players.iter().map(|p| p.nickname.as_str()).collect();
    // Origin A: A writes, B draws; B writes, C draws; C writes, A draws
    let chain_a = &chains[0];
    assert_eq!(chain_a.origin_nickname, names[0]);
    let walk: Vec<(i32, &str, &str)> = chain_a
        .steps
        .iter()
        .map(|s| (s.round, s.prompt_author.as_str(), s.animation_author.as_str()))
        .collect();
    assert_eq!(
        walk,
        vec![
            (1, names[0], names[1]),
            (2, names[1], names[2]),
            (3, names[2], names[0]),
        ]
    );

    for step in &chain_a.steps {
        assert_eq!(step.prompt, Some(prompt_text(&step.prompt_author, step.round)));
        let frames: Vec<String> = step
            .animation_frames
            .iter()
            .map(|f| f.image_data.clone())
            .collect();
        let expected: Vec<String> = (0..3)
            .map(|slot| frame_data(&step.animation_author, step.round, slot))
            .collect();
        assert_eq!(frames, expected);
    }

    // Each round, every player appears exactly once as author and once as drawer
    for round in 1..=3 {
        let mut authors: Vec<i64> = chains
            .iter()
            .map(|c| c.steps[round - 1].prompt_author_id)
            .collect();
        let mut drawers: Vec<i64> = chains
            .iter()
            .map(|c| c.steps[round - 1].animation_author_id)
            .collect();
        authors.sort_unstable();
        drawers.sort_unstable();
        let mut everyone: Vec<i64> = game.players.iter().map(|p| p.id).collect();
        everyone.sort_unstable();
        assert_eq!(authors, everyone);
        assert_eq!(drawers, everyone);
    }
    Ok(())
}

/// Test: a player who never wrote or drew leaves gaps, not errors
#[tokio::test]
async fn test_silent_player_chain_is_total() -> Result<(), AppError> {
    let mut game = started_game(memory_store().await?, 3, 3).await?;
    let silent = game.players[2].id;
    play_to_completion(&mut game, &[silent]).await?;

    let chains = load_chains(game.store.as_ref(), game.id()).await?;
    for chain in &chains {
        assert_eq!(chain.steps.len(), 3);
        for step in &chain.steps {
            if step.prompt_author_id == silent {
                assert_eq!(step.prompt, None);
            } else {
                assert!(step.prompt.is_some());
            }
            if step.animation_author_id == silent {
                assert!(step.animation_frames.is_empty());
            } else {
                assert_eq!(step.animation_frames.len(), 3);
            }
        }
    }
    Ok(())
}

/// Test: frames saved against a duplicate round row still show up
#[tokio::test]
async fn test_duplicate_round_rows_are_pooled() -> Result<(), AppError> {
    let mut game = started_game(memory_store().await?, 2, 3).await?;
    play_phase(&mut game, &[]).await?;

    // A second row for round 1, as a racing client might insert
    let original = ensure_round(game.store.as_ref(), game.id(), 1).await?;
    let duplicate = game.store.insert_round(game.id(), 1).await?;
    assert_ne!(original.id, duplicate.id);

    let drawer = game.players[1].clone();
    game.store
        .insert_frame(
            game.id(),
            NewFrame {
                round_id: original.id,
                player_id: drawer.id,
                frame_number: 0,
                image_data: "on original".into(),
            },
        )
        .await?;
    game.store
        .insert_frame(
            game.id(),
            NewFrame {
                round_id: duplicate.id,
                player_id: drawer.id,
                frame_number: 1,
                image_data: "on duplicate".into(),
            },
        )
        .await?;

    let silent: Vec<i64> = game.players.iter().map(|p| p.id).collect();
    play_to_completion(&mut game, &silent).await?;

    let chains = load_chains(game.store.as_ref(), game.id()).await?;
    let step = &chains[0].steps[0];
    assert_eq!(step.animation_author_id, drawer.id);
    let data: Vec<&str> = step
        .animation_frames
        .iter()
        .map(|f| f.image_data.as_str())
        .collect();
    assert_eq!(data, vec!["on original", "on duplicate"]);
    Ok(())
}

/// Test: chains are only served for completed games
#[tokio::test]
async fn test_chains_need_completed_game() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let err = load_chains(game.store.as_ref(), game.id()).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation(ValidationKind::WrongPhase, _)));

    let err = load_chains(game.store.as_ref(), 424_242).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(NotFoundKind::Game, _)));
    Ok(())
}
