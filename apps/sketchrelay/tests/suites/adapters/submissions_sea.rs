//! Adapter tests for submissions_sea: idempotent upsert per phase.

use sketchrelay::adapters::games_sea::{self, GameCreate};
use sketchrelay::adapters::players_sea::{self, PlayerCreate};
use sketchrelay::adapters::submissions_sea;
use sketchrelay::entities::Phase;
use sketchrelay::AppError;

use crate::support::db::memory_db;

/// Test: repeating a submission keeps exactly one row with the first timestamp
#[tokio::test]
async fn test_upsert_submission_is_idempotent() -> Result<(), AppError> {
    let db = memory_db().await?;
    let game = games_sea::create_game(
        &db,
        GameCreate {
            room_code: "jolly pebble".into(),
            frames_per_round: 3,
        },
    )
    .await?;
    let p = players_sea::create_player(
        &db,
        PlayerCreate {
            game_id: game.id,
            nickname: "Bo".into(),
            turn_order: 1,
            is_host: true,
        },
    )
    .await?;

    submissions_sea::upsert_submission(&db, game.id, 1, p.id, Phase::Prompt).await?;
    let first = submissions_sea::list_for_phase(&db, game.id, 1, Phase::Prompt).await?;
    assert_eq!(first.len(), 1);

    for _ in 0..3 {
        submissions_sea::upsert_submission(&db, game.id, 1, p.id, Phase::Prompt).await?;
    }
    let again = submissions_sea::list_for_phase(&db, game.id, 1, Phase::Prompt).await?;
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].id, first[0].id);
    assert_eq!(again[0].submitted_at, first[0].submitted_at);
    Ok(())
}

/// Test: phases and rounds are tracked separately
#[tokio::test]
async fn test_submissions_scoped_by_round_and_phase() -> Result<(), AppError> {
    let db = memory_db().await?;
    let game = games_sea::create_game(
        &db,
        GameCreate {
            room_code: "witty lodge".into(),
            frames_per_round: 3,
        },
    )
    .await?;
    let p = players_sea::create_player(
        &db,
        PlayerCreate {
            game_id: game.id,
            nickname: "Cy".into(),
            turn_order: 1,
            is_host: true,
        },
    )
    .await?;

    submissions_sea::upsert_submission(&db, game.id, 1, p.id, Phase::Prompt).await?;
    submissions_sea::upsert_submission(&db, game.id, 1, p.id, Phase::Drawing).await?;
    submissions_sea::upsert_submission(&db, game.id, 2, p.id, Phase::Prompt).await?;

    for (round, phase) in [(1, Phase::Prompt), (1, Phase::Drawing), (2, Phase::Prompt)] {
        let rows = submissions_sea::list_for_phase(&db, game.id, round, phase).await?;
        assert_eq!(rows.len(), 1, "round {round} {phase:?}");
    }
    assert!(submissions_sea::list_for_phase(&db, game.id, 2, Phase::Drawing)
        .await?
        .is_empty());
    Ok(())
}
