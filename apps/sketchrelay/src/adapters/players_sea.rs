//! SeaORM adapter for players.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

use crate::entities::players;

#[derive(Debug, Clone)]
pub struct PlayerCreate {
    pub game_id: i64,
    pub nickname: String,
    pub turn_order: i32,
    pub is_host: bool,
}

/// Roster in turn order.
pub async fn list_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
) -> Result<Vec<players::Model>, sea_orm::DbErr> {
    players::Entity::find()
        .filter(players::Column::GameId.eq(game_id))
        .order_by_asc(players::Column::TurnOrder)
        .order_by_asc(players::Column::Id)
        .all(conn)
        .await
}

pub async fn max_turn_order<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
) -> Result<Option<i32>, sea_orm::DbErr> {
    players::Entity::find()
        .select_only()
        .column_as(players::Column::TurnOrder.max(), "max_turn_order")
        .filter(players::Column::GameId.eq(game_id))
        .into_tuple::<Option<i32>>()
        .one(conn)
        .await
        .map(Option::flatten)
}

pub async fn create_player<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: PlayerCreate,
) -> Result<players::Model, sea_orm::DbErr> {
    players::ActiveModel {
        id: NotSet,
        game_id: Set(dto.game_id),
        nickname: Set(dto.nickname),
        turn_order: Set(dto.turn_order),
        is_host: Set(dto.is_host),
        created_at: Set(time::OffsetDateTime::now_utc()),
    }
    .insert(conn)
    .await
}
