//! SeaORM adapter for prompts, unique per (game, round_number, player).

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};

use crate::entities::prompts;

/// Insert or overwrite the player's prompt for a round.
pub async fn upsert_prompt<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
    round_number: i32,
    player_id: i64,
    text: &str,
) -> Result<(), sea_orm::DbErr> {
    let now = time::OffsetDateTime::now_utc();
    let active = prompts::ActiveModel {
        id: NotSet,
        game_id: Set(game_id),
        round_number: Set(round_number),
        player_id: Set(player_id),
        text: Set(text.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    prompts::Entity::insert(active)
        .on_conflict(
            OnConflict::columns([
                prompts::Column::GameId,
                prompts::Column::RoundNumber,
                prompts::Column::PlayerId,
            ])
            .update_columns([prompts::Column::Text, prompts::Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn list_by_game<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
    round_number: Option<i32>,
) -> Result<Vec<prompts::Model>, sea_orm::DbErr> {
    let mut query = prompts::Entity::find().filter(prompts::Column::GameId.eq(game_id));
    if let Some(n) = round_number {
        query = query.filter(prompts::Column::RoundNumber.eq(n));
    }
    query
        .order_by_asc(prompts::Column::RoundNumber)
        .order_by_asc(prompts::Column::Id)
        .all(conn)
        .await
}
