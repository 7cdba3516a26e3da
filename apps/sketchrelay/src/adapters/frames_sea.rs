//! SeaORM adapter for frames. Append-only: every autosave is a new row.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, QueryOrder,
    Set,
};

use crate::entities::frames;

#[derive(Debug, Clone)]
pub struct FrameCreate {
    pub round_id: i64,
    pub player_id: i64,
    pub frame_number: i16,
    pub image_data: String,
}

pub async fn create_frame<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    dto: FrameCreate,
) -> Result<frames::Model, sea_orm::DbErr> {
    frames::ActiveModel {
        id: NotSet,
        round_id: Set(dto.round_id),
        player_id: Set(dto.player_id),
        frame_number: Set(dto.frame_number),
        image_data: Set(dto.image_data),
        saved_at: Set(time::OffsetDateTime::now_utc()),
    }
    .insert(conn)
    .await
}

/// All autosaves for the given round rows, optionally for one player.
pub async fn list_by_rounds<C: ConnectionTrait + Send + Sync>(
    conn: &C,
    round_ids: &[i64],
    player_id: Option<i64>,
) -> Result<Vec<frames::Model>, sea_orm::DbErr> {
    if round_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut query =
        frames::Entity::find().filter(frames::Column::RoundId.is_in(round_ids.iter().copied()));
    if let Some(pid) = player_id {
        query = query.filter(frames::Column::PlayerId.eq(pid));
    }
    query
        .order_by_asc(frames::Column::SavedAt)
        .order_by_asc(frames::Column::Id)
        .all(conn)
        .await
}
