use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_query::{ColumnDef, ForeignKeyAction, Index, Table};

#[derive(DeriveMigrationName)]
pub struct Migration;

// ----- Iden enums for tables & columns -----
#[derive(Iden)]
enum Games {
    Table,
    Id,
    RoomCode,
    Status,
    CurrentRound,
    TotalRounds,
    FramesPerRound,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Players {
    Table,
    Id,
    GameId,
    Nickname,
    TurnOrder,
    IsHost,
    CreatedAt,
}

#[derive(Iden)]
enum Rounds {
    Table,
    Id,
    GameId,
    RoundNumber,
    StartedAt,
}

#[derive(Iden)]
enum Prompts {
    Table,
    Id,
    GameId,
    RoundNumber,
    PlayerId,
    Text,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Frames {
    Table,
    Id,
    RoundId,
    PlayerId,
    FrameNumber,
    ImageData,
    SavedAt,
}

#[derive(Iden)]
enum Submissions {
    Table,
    Id,
    GameId,
    RoundNumber,
    PlayerId,
    Phase,
    SubmittedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        match manager.get_database_backend() {
            sea_orm::DatabaseBackend::Postgres | sea_orm::DatabaseBackend::Sqlite => {}
            _ => return Err(DbErr::Custom("Unsupported database backend".into())),
        }

        // Status and phase are stored as plain text so the same schema runs on
        // Postgres and SQLite.

        // games
        manager
            .create_table(
                Table::create()
                    .table(Games::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Games::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Games::RoomCode).string_len(64).not_null())
                    .col(ColumnDef::new(Games::Status).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Games::CurrentRound)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Games::TotalRounds)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Games::FramesPerRound).small_integer().not_null())
                    .col(ColumnDef::new(Games::Version).integer().not_null().default(1))
                    .col(
                        ColumnDef::new(Games::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Games::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_games_room_code")
                    .table(Games::Table)
                    .col(Games::RoomCode)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // players
        manager
            .create_table(
                Table::create()
                    .table(Players::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Players::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Players::GameId).big_integer().not_null())
                    .col(ColumnDef::new(Players::Nickname).string_len(32).not_null())
                    .col(ColumnDef::new(Players::TurnOrder).integer().not_null())
                    .col(
                        ColumnDef::new(Players::IsHost)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Players::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_players_game_id")
                            .from(Players::Table, Players::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_players_game_turn_order")
                    .table(Players::Table)
                    .col(Players::GameId)
                    .col(Players::TurnOrder)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // rounds: no unique key on round_number, duplicates are resolved at read time
        manager
            .create_table(
                Table::create()
                    .table(Rounds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rounds::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Rounds::GameId).big_integer().not_null())
                    .col(ColumnDef::new(Rounds::RoundNumber).integer().not_null())
                    .col(
                        ColumnDef::new(Rounds::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rounds_game_id")
                            .from(Rounds::Table, Rounds::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_rounds_game_round_number")
                    .table(Rounds::Table)
                    .col(Rounds::GameId)
                    .col(Rounds::RoundNumber)
                    .to_owned(),
            )
            .await?;

        // prompts
        manager
            .create_table(
                Table::create()
                    .table(Prompts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Prompts::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Prompts::GameId).big_integer().not_null())
                    .col(ColumnDef::new(Prompts::RoundNumber).integer().not_null())
                    .col(ColumnDef::new(Prompts::PlayerId).big_integer().not_null())
                    .col(ColumnDef::new(Prompts::Text).text().not_null())
                    .col(
                        ColumnDef::new(Prompts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Prompts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompts_game_id")
                            .from(Prompts::Table, Prompts::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_prompts_player_id")
                            .from(Prompts::Table, Prompts::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_prompts_game_round_player")
                    .table(Prompts::Table)
                    .col(Prompts::GameId)
                    .col(Prompts::RoundNumber)
                    .col(Prompts::PlayerId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // frames: append-only, every autosave is a new row
        manager
            .create_table(
                Table::create()
                    .table(Frames::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Frames::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Frames::RoundId).big_integer().not_null())
                    .col(ColumnDef::new(Frames::PlayerId).big_integer().not_null())
                    .col(ColumnDef::new(Frames::FrameNumber).small_integer().not_null())
                    .col(ColumnDef::new(Frames::ImageData).text().not_null())
                    .col(
                        ColumnDef::new(Frames::SavedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_frames_round_id")
                            .from(Frames::Table, Frames::RoundId)
                            .to(Rounds::Table, Rounds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_frames_player_id")
                            .from(Frames::Table, Frames::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ix_frames_round_player")
                    .table(Frames::Table)
                    .col(Frames::RoundId)
                    .col(Frames::PlayerId)
                    .to_owned(),
            )
            .await?;

        // submissions
        manager
            .create_table(
                Table::create()
                    .table(Submissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Submissions::Id)
                            .big_integer()
                            .not_null()
                            .primary_key()
                            .auto_increment(),
                    )
                    .col(ColumnDef::new(Submissions::GameId).big_integer().not_null())
                    .col(ColumnDef::new(Submissions::RoundNumber).integer().not_null())
                    .col(ColumnDef::new(Submissions::PlayerId).big_integer().not_null())
                    .col(ColumnDef::new(Submissions::Phase).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Submissions::SubmittedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_submissions_game_id")
                            .from(Submissions::Table, Submissions::GameId)
                            .to(Games::Table, Games::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_submissions_player_id")
                            .from(Submissions::Table, Submissions::PlayerId)
                            .to(Players::Table, Players::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_submissions_game_round_player_phase")
                    .table(Submissions::Table)
                    .col(Submissions::GameId)
                    .col(Submissions::RoundNumber)
                    .col(Submissions::PlayerId)
                    .col(Submissions::Phase)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // drop in reverse order + drop index before table
        manager
            .drop_index(
                Index::drop()
                    .name("ux_submissions_game_round_player_phase")
                    .table(Submissions::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Submissions::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ix_frames_round_player")
                    .table(Frames::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Frames::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ux_prompts_game_round_player")
                    .table(Prompts::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Prompts::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ix_rounds_game_round_number")
                    .table(Rounds::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Rounds::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ux_players_game_turn_order")
                    .table(Players::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Players::Table).to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("ux_games_room_code")
                    .table(Games::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Games::Table).to_owned())
            .await?;

        Ok(())
    }
}
