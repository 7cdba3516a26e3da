//! SeaORM adapter for submission records.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder, Set};

use crate::entities::{submissions, Phase};

/// Record that a player finished a phase. Repeating the call is a no-op:
/// the first `submitted_at` is kept.
pub async fn upsert_submission<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
    round_number: i32,
    player_id: i64,
    phase: Phase,
) -> Result<(), sea_orm::DbErr> {
    let active = submissions::ActiveModel {
        id: NotSet,
        game_id: Set(game_id),
        round_number: Set(round_number),
        player_id: Set(player_id),
        phase: Set(phase),
        submitted_at: Set(time::OffsetDateTime::now_utc()),
    };

    submissions::Entity::insert(active)
        .on_conflict(
            OnConflict::columns([
                submissions::Column::GameId,
                submissions::Column::RoundNumber,
                submissions::Column::PlayerId,
                submissions::Column::Phase,
            ])
            .update_column(submissions::Column::Phase)
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

pub async fn list_for_phase<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    game_id: i64,
    round_number: i32,
    phase: Phase,
) -> Result<Vec<submissions::Model>, sea_orm::DbErr> {
    submissions::Entity::find()
        .filter(submissions::Column::GameId.eq(game_id))
        .filter(submissions::Column::RoundNumber.eq(round_number))
        .filter(submissions::Column::Phase.eq(phase))
        .order_by_asc(submissions::Column::Id)
        .all(conn)
        .await
}
