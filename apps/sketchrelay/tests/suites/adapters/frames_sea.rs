//! Adapter tests for rounds_sea and frames_sea: append-only rows.

use sketchrelay::adapters::frames_sea::{self, FrameCreate};
use sketchrelay::adapters::games_sea::{self, GameCreate};
use sketchrelay::adapters::players_sea::{self, PlayerCreate};
use sketchrelay::adapters::rounds_sea;
use sketchrelay::AppError;

use crate::support::db::memory_db;

/// Test: duplicate round rows are stored, not rejected
#[tokio::test]
async fn test_duplicate_rounds_allowed() -> Result<(), AppError> {
    let db = memory_db().await?;
    let game = games_sea::create_game(
        &db,
        GameCreate {
            room_code: "eager valley".into(),
            frames_per_round: 3,
        },
    )
    .await?;

    let a = rounds_sea::create_round(&db, game.id, 1).await?;
    let b = rounds_sea::create_round(&db, game.id, 1).await?;
    rounds_sea::create_round(&db, game.id, 2).await?;
    assert_ne!(a.id, b.id);

    assert_eq!(rounds_sea::list_by_game(&db, game.id, Some(1)).await?.len(), 2);
    assert_eq!(rounds_sea::list_by_game(&db, game.id, None).await?.len(), 3);
    Ok(())
}

/// Test: every autosave is a new row; listing filters by rounds and player
#[tokio::test]
async fn test_frames_append_and_filter() -> Result<(), AppError> {
    let db = memory_db().await?;
    let game = games_sea::create_game(
        &db,
        GameCreate {
            room_code: "fuzzy docks".into(),
            frames_per_round: 3,
        },
    )
    .await?;
    let mut ids = Vec::new();
    for (i, name) in ["Ada", "Bo"].iter().enumerate() {
        let p = players_sea::create_player(
            &db,
            PlayerCreate {
                game_id: game.id,
                nickname: name.to_string(),
                turn_order: i as i32 + 1,
                is_host: i == 0,
            },
        )
        .await?;
        ids.push(p.id);
    }
    let round = rounds_sea::create_round(&db, game.id, 1).await?;

    for (player_id, data) in [(ids[0], "a1"), (ids[0], "a2"), (ids[1], "b1")] {
        frames_sea::create_frame(
            &db,
            FrameCreate {
                round_id: round.id,
                player_id,
                frame_number: 0,
                image_data: data.into(),
            },
        )
        .await?;
    }

    let all = frames_sea::list_by_rounds(&db, &[round.id], None).await?;
    assert_eq!(all.len(), 3);

    let mine = frames_sea::list_by_rounds(&db, &[round.id], Some(ids[0])).await?;
    let data: Vec<_> = mine.iter().map(|f| f.image_data.as_str()).collect();
    assert_eq!(data, vec!["a1", "a2"]);

    assert!(frames_sea::list_by_rounds(&db, &[], None).await?.is_empty());
    Ok(())
}
