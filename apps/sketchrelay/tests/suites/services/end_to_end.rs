//! Whole games: manual play and independent clients sharing one store.

use std::sync::Arc;
use std::time::Duration;

use sketchrelay::config::client::ClientTuning;
use sketchrelay::domain::chain::Chain;
use sketchrelay::domain::{GameCursor, GameStatus};
use sketchrelay::services::assignments::{load_task, TaskDetail};
use sketchrelay::services::{BotAgent, ClientExit, GameClient, IdleAgent, PlayerAgent};
use sketchrelay::AppError;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::support::db::{memory_store, memory_store_with_feed};
use crate::support::game_setup::{fast_tuning, started_game, TestGame};
use crate::support::play::{play_phase, prompt_text};

/// Run one client per player until all finish; idle players get `IdleAgent`.
async fn run_clients(
    game: &TestGame,
    idle: &[i64],
    tuning: ClientTuning,
) -> Result<Vec<Vec<Chain>>, AppError> {
    let cancel = CancellationToken::new();
    let mut set = JoinSet::new();
    for (i, p) in game.players.iter().enumerate() {
        let agent: Arc<dyn PlayerAgent> = if idle.contains(&p.id) {
            Arc::new(IdleAgent)
        } else {
            Arc::new(BotAgent::new(Duration::from_millis(2), Some(i as u64)))
        };
        let client = GameClient::new(game.store.clone(), game.id(), p.id, agent, tuning.clone());
        let cancel = cancel.clone();
        set.spawn(async move { client.run(cancel).await });
    }

    let collected = timeout(Duration::from_secs(30), async {
        let mut all = Vec::new();
        while let Some(joined) = set.join_next().await {
            let exit = joined.map_err(|e| AppError::internal(e.to_string()))??;
            match exit {
                ClientExit::Completed(chains) => all.push(chains),
                ClientExit::Cancelled => return Err(AppError::internal("client cancelled")),
            }
        }
        Ok::<_, AppError>(all)
    })
    .await;

    cancel.cancel();
    collected.map_err(|_| AppError::internal("game did not finish in time"))?
}

/// Test: three players walk the ring by hand, and tasks match the rotation
#[tokio::test]
async fn test_three_player_manual_game() -> Result<(), AppError> {
    let mut game = started_game(memory_store().await?, 3, 3).await?;
    let [a, b, c] = [
        game.players[0].clone(),
        game.players[1].clone(),
        game.players[2].clone(),
    ];

    // Round 1: everyone writes an origin prompt
    play_phase(&mut game, &[]).await?;

    // B illustrates A, C illustrates B, A illustrates C
    for (drawer, author) in [(&b, &a), (&c, &b), (&a, &c)] {
        let task = load_task(game.store.as_ref(), game.id(), drawer.id).await?;
        match task.detail {
            TaskDetail::Draw {
                prompt_author_id,
                prompt,
                ..
            } => {
                assert_eq!(prompt_author_id, author.id);
                assert_eq!(prompt, Some(prompt_text(&author.nickname, 1)));
            }
            other => panic!("expected a drawing task, got {other:?}"),
        }
    }
    let next = play_phase(&mut game, &[]).await?;
    assert_eq!(next, GameCursor::new(GameStatus::Prompt, 2));

    // Round 2: each player captions what they just drew
    for p in [&a, &b, &c] {
        let task = load_task(game.store.as_ref(), game.id(), p.id).await?;
        match task.detail {
            TaskDetail::WritePrompt {
                round,
                previous_animation,
            } => {
                assert_eq!(round, 2);
                let frames = previous_animation.unwrap_or_default();
                assert_eq!(frames.len(), 3);
                assert!(frames[0].image_data.starts_with(&p.nickname));
            }
            other => panic!("expected a prompt task, got {other:?}"),
        }
    }
    play_phase(&mut game, &[]).await?;

    // Round 2 drawers are the next ring step: C draws B's caption
    let task = load_task(game.store.as_ref(), game.id(), c.id).await?;
    assert!(matches!(task.detail, TaskDetail::Draw { prompt_author_id, .. } if prompt_author_id == b.id));

    play_phase(&mut game, &[]).await?;
    play_phase(&mut game, &[]).await?;
    let last = play_phase(&mut game, &[]).await?;
    assert_eq!(last.status, GameStatus::Complete);

    let task = load_task(game.store.as_ref(), game.id(), a.id).await?;
    assert_eq!(task.detail, TaskDetail::Complete);
    assert_eq!(task.progress, None);
    Ok(())
}

/// Test: independent bot clients finish the game and agree on the chains
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_bot_clients_complete_game() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 3, 3).await?;
    let tuning = fast_tuning(Duration::from_secs(10), Duration::from_secs(10));

    let results = run_clients(&game, &[], tuning).await?;
    assert_eq!(results.len(), 3);
    for chains in &results {
        assert_eq!(chains, &results[0]);
    }
    for chain in &results[0] {
        assert_eq!(chain.steps.len(), 3);
        for step in &chain.steps {
            assert!(step.prompt.as_deref().is_some_and(|p| !p.is_empty()));
            assert_eq!(step.animation_frames.len(), 3);
        }
    }
    Ok(())
}

/// Test: an idle player is carried through by their own deadlines
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_idle_player_carried_by_deadline() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 3, 3).await?;
    let idle = game.players[2].id;
    let tuning = fast_tuning(Duration::from_millis(150), Duration::from_millis(150));

    let results = run_clients(&game, &[idle], tuning).await?;
    let chains = &results[0];
    assert_eq!(chains.len(), 3);
    for step in chains.iter().flat_map(|c| c.steps.iter()) {
        if step.prompt_author_id == idle {
            assert_eq!(step.prompt.as_deref(), Some(""));
        }
        if step.animation_author_id == idle {
            assert!(step.animation_frames.is_empty());
        }
    }
    Ok(())
}

/// Test: clients woken by change events finish without relying on polling
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_change_feed_drives_clients() -> Result<(), AppError> {
    let (store, _feed) = memory_store_with_feed().await?;
    let game = started_game(store, 2, 3).await?;
    let mut tuning = fast_tuning(Duration::from_secs(10), Duration::from_secs(10));
    tuning.poll_interval = Duration::from_millis(500);

    let results = run_clients(&game, &[], tuning).await?;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0], results[1]);
    Ok(())
}

/// Test: a cancelled client stops promptly
#[tokio::test]
async fn test_client_cancellation() -> Result<(), AppError> {
    let game = started_game(memory_store().await?, 2, 3).await?;
    let client = GameClient::new(
        game.store.clone(),
        game.id(),
        game.host().id,
        Arc::new(IdleAgent),
        fast_tuning(Duration::from_secs(60), Duration::from_secs(60)),
    );
    let cancel = CancellationToken::new();
    let stopper = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        stopper.cancel();
    });

    let exit = timeout(Duration::from_secs(5), client.run(cancel))
        .await
        .map_err(|_| AppError::internal("client ignored cancellation"))??;
    assert_eq!(exit, ClientExit::Cancelled);
    assert_eq!(client.deadline().remaining(), None);
    Ok(())
}
