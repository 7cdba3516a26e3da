//! SeaORM adapter for games - generic over ConnectionTrait.

use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};

use crate::entities::games::{self, GameStatus};

pub mod dto;

pub use dto::{GameCreate, GameCursorSwap};

pub async fn find_by_id<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
) -> Result<Option<games::Model>, sea_orm::DbErr> {
    games::Entity::find_by_id(game_id).one(conn).await
}

pub async fn find_by_room_code<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    room_code: &str,
) -> Result<Option<games::Model>, sea_orm::DbErr> {
    games::Entity::find()
        .filter(games::Column::RoomCode.eq(room_code))
        .one(conn)
        .await
}

pub async fn create_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: GameCreate,
) -> Result<games::Model, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let game_active = games::ActiveModel {
        id: NotSet,
        room_code: Set(dto.room_code),
        status: Set(GameStatus::Lobby),
        current_round: Set(0),
        total_rounds: Set(0),
        frames_per_round: Set(dto.frames_per_round),
        version: Set(1),
        created_at: Set(now),
        updated_at: Set(now),
    };

    game_active.insert(conn).await
}

/// Compare-and-swap on `(status, current_round)`.
///
/// Returns `true` when this call moved the cursor. `false` means the stored
/// pair no longer matched (or the game does not exist); callers re-read to
/// tell a lost race from a move someone else already made.
pub async fn compare_and_set_cursor<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: GameCursorSwap,
) -> Result<bool, sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();

    let mut update = games::Entity::update_many()
        .col_expr(games::Column::Status, Expr::value(dto.next_status))
        .col_expr(games::Column::CurrentRound, Expr::value(dto.next_round))
        .col_expr(games::Column::UpdatedAt, Expr::value(now))
        .col_expr(games::Column::Version, Expr::col(games::Column::Version).add(1));

    if let Some(total) = dto.total_rounds {
        update = update.col_expr(games::Column::TotalRounds, Expr::value(total));
    }

    let result = update
        .filter(games::Column::Id.eq(dto.id))
        .filter(games::Column::Status.eq(dto.expected_status))
        .filter(games::Column::CurrentRound.eq(dto.expected_round))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}
