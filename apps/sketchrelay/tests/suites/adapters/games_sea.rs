//! Adapter tests for games_sea: creation, lookup and the cursor CAS.

use sea_orm::DatabaseConnection;
use sketchrelay::adapters::games_sea::{self, GameCreate, GameCursorSwap};
use sketchrelay::entities::{games, GameStatus};
use sketchrelay::errors::domain::{ConflictKind, DomainError};
use sketchrelay::infra::db_errors::map_db_err;
use sketchrelay::AppError;

use crate::support::db::memory_db;

fn create(code: &str) -> GameCreate {
    GameCreate {
        room_code: code.to_string(),
        frames_per_round: 5,
    }
}

fn swap(id: i64, from: (GameStatus, i32), to: (GameStatus, i32)) -> GameCursorSwap {
    GameCursorSwap {
        id,
        expected_status: from.0,
        expected_round: from.1,
        next_status: to.0,
        next_round: to.1,
        total_rounds: None,
    }
}

/// Test: a new game sits in the lobby at round 0
#[tokio::test]
async fn test_create_and_find() -> Result<(), AppError> {
    let db = memory_db().await?;

    let created = games_sea::create_game(&db, create("sunny creek")).await?;
    assert!(created.id > 0);
    assert_eq!(created.status, GameStatus::Lobby);
    assert_eq!(created.current_round, 0);
    assert_eq!(created.total_rounds, 0);
    assert_eq!(created.version, 1);

    let by_id = games_sea::find_by_id(&db, created.id).await?;
    assert_eq!(by_id.map(|g| g.id), Some(created.id));

    let by_code = games_sea::find_by_room_code(&db, "sunny creek").await?;
    assert_eq!(by_code.map(|g| g.id), Some(created.id));

    assert!(games_sea::find_by_room_code(&db, "nope").await?.is_none());
    Ok(())
}

/// Test: duplicate room codes map to RoomCodeTaken
#[tokio::test]
async fn test_room_code_unique() -> Result<(), AppError> {
    let db = memory_db().await?;
    games_sea::create_game(&db, create("calm otter")).await?;

    let err = games_sea::create_game(&db, create("calm otter"))
        .await
        .map_err(map_db_err)
        .unwrap_err();
    assert!(
        matches!(err, DomainError::Conflict(ConflictKind::RoomCodeTaken, _)),
        "got {err:?}"
    );
    Ok(())
}

/// Test: looking up a missing game finds nothing
#[tokio::test]
async fn test_find_missing_game() -> Result<(), AppError> {
    let db = memory_db().await?;
    assert!(games_sea::find_by_id(&db, 424242).await?.is_none());
    assert!(games_sea::find_by_room_code(&db, "no such room").await?.is_none());
    Ok(())
}

async fn load_stored(db: &DatabaseConnection, game_id: i64) -> Result<games::Model, AppError> {
    games_sea::find_by_id(db, game_id)
        .await?
        .ok_or_else(|| AppError::internal("game vanished"))
}

/// Test: the CAS applies once; a stale expectation changes nothing
#[tokio::test]
async fn test_compare_and_set_cursor() -> Result<(), AppError> {
    let db = memory_db().await?;
    let game = games_sea::create_game(&db, create("odd walrus")).await?;

    let mut start = swap(game.id, (GameStatus::Lobby, 0), (GameStatus::Prompt, 1));
    start.total_rounds = Some(3);
    assert!(games_sea::compare_and_set_cursor(&db, start.clone()).await?);
    assert!(!games_sea::compare_and_set_cursor(&db, start).await?);

    let stored = load_stored(&db, game.id).await?;
    assert_eq!(stored.status, GameStatus::Prompt);
    assert_eq!(stored.current_round, 1);
    assert_eq!(stored.total_rounds, 3);
    assert_eq!(stored.version, 2);

    // Round mismatch with matching status is still rejected
    let stale = swap(game.id, (GameStatus::Prompt, 2), (GameStatus::Drawing, 2));
    assert!(!games_sea::compare_and_set_cursor(&db, stale).await?);

    let next = swap(game.id, (GameStatus::Prompt, 1), (GameStatus::Drawing, 1));
    assert!(games_sea::compare_and_set_cursor(&db, next).await?);

    let stored = load_stored(&db, game.id).await?;
    assert_eq!(stored.status, GameStatus::Drawing);
    assert_eq!(stored.total_rounds, 3, "total only changes when given");
    assert_eq!(stored.version, 3);
    Ok(())
}

/// Test: CAS against a missing game reports no change
#[tokio::test]
async fn test_compare_and_set_missing_game() -> Result<(), AppError> {
    let db = memory_db().await?;
    let ghost = swap(999, (GameStatus::Lobby, 0), (GameStatus::Prompt, 1));
    assert!(!games_sea::compare_and_set_cursor(&db, ghost).await?);
    Ok(())
}
