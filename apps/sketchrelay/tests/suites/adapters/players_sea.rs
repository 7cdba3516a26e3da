//! Adapter tests for players_sea.

use sketchrelay::adapters::games_sea::{self, GameCreate};
use sketchrelay::adapters::players_sea::{self, PlayerCreate};
use sketchrelay::errors::domain::{ConflictKind, DomainError};
use sketchrelay::infra::db_errors::map_db_err;
use sketchrelay::AppError;

use crate::support::db::memory_db;

fn player(game_id: i64, nickname: &str, turn_order: i32) -> PlayerCreate {
    PlayerCreate {
        game_id,
        nickname: nickname.to_string(),
        turn_order,
        is_host: turn_order == 1,
    }
}

/// Test: roster comes back in turn order regardless of insert order
#[tokio::test]
async fn test_list_by_game_orders_by_turn() -> Result<(), AppError> {
    let db = memory_db().await?;
    let game = games_sea::create_game(
        &db,
        GameCreate {
            room_code: "tiny tiger".into(),
            frames_per_round: 3,
        },
    )
    .await?;

    assert_eq!(players_sea::max_turn_order(&db, game.id).await?, None);

    players_sea::create_player(&db, player(game.id, "C", 3)).await?;
    players_sea::create_player(&db, player(game.id, "A", 1)).await?;
    players_sea::create_player(&db, player(game.id, "B", 2)).await?;

    let names: Vec<String> = players_sea::list_by_game(&db, game.id)
        .await?
        .into_iter()
        .map(|p| p.nickname)
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(players_sea::max_turn_order(&db, game.id).await?, Some(3));
    Ok(())
}

/// Test: two players cannot share a turn order in one game
#[tokio::test]
async fn test_turn_order_unique_per_game() -> Result<(), AppError> {
    let db = memory_db().await?;
    let a = games_sea::create_game(
        &db,
        GameCreate {
            room_code: "quiet mill".into(),
            frames_per_round: 3,
        },
    )
    .await?;
    let b = games_sea::create_game(
        &db,
        GameCreate {
            room_code: "proud yard".into(),
            frames_per_round: 3,
        },
    )
    .await?;

    players_sea::create_player(&db, player(a.id, "A", 1)).await?;
    // Same turn order in another game is fine
    players_sea::create_player(&db, player(b.id, "A", 1)).await?;

    let err = players_sea::create_player(&db, player(a.id, "B", 1))
        .await
        .map_err(map_db_err)
        .unwrap_err();
    assert!(
        matches!(err, DomainError::Conflict(ConflictKind::TurnOrderTaken, _)),
        "got {err:?}"
    );
    Ok(())
}
