//! SeaORM adapter for rounds. Duplicate rows per round number are allowed.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::rounds;

pub async fn list_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
    round_number: Option<i32>,
) -> Result<Vec<rounds::Model>, sea_orm::DbErr> {
    let mut query = rounds::Entity::find().filter(rounds::Column::GameId.eq(game_id));
    if let Some(n) = round_number {
        query = query.filter(rounds::Column::RoundNumber.eq(n));
    }
    query
        .order_by_asc(rounds::Column::RoundNumber)
        .order_by_asc(rounds::Column::StartedAt)
        .order_by_asc(rounds::Column::Id)
        .all(conn)
        .await
}

pub async fn create_round<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
    round_number: i32,
) -> Result<rounds::Model, sea_orm::DbErr> {
    rounds::ActiveModel {
        id: NotSet,
        game_id: Set(game_id),
        round_number: Set(round_number),
        started_at: Set(time::OffsetDateTime::now_utc()),
    }
    .insert(conn)
    .await
}
