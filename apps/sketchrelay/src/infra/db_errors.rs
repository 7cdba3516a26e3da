//! SeaORM -> DomainError translation helpers.
//!
//! Adapters return `sea_orm::DbErr`; the store converts through
//! `map_db_err` so services only ever see `DomainError`.

use tracing::{error, warn};

use crate::errors::domain::{ConflictKind, DomainError, InfraErrorKind, NotFoundKind};

fn mentions_sqlstate(msg: &str, code: &str) -> bool {
    msg.contains(code) || msg.contains(&format!("SQLSTATE({code})"))
}

/// Columns listed by SQLite in "UNIQUE constraint failed: t.a, t.b".
fn extract_sqlite_columns(error_msg: &str) -> Option<&str> {
    let marker = "UNIQUE constraint failed: ";
    let start = error_msg.find(marker)? + marker.len();
    let rest = &error_msg[start..];
    let end = rest.find(['\n', '"', ')']).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn map_sqlite_columns_to_conflict(columns: &str) -> Option<(ConflictKind, &'static str)> {
    match columns {
        "games.room_code" => Some((ConflictKind::RoomCodeTaken, "Room code already exists")),
        "players.game_id, players.turn_order" => {
            Some((ConflictKind::TurnOrderTaken, "Turn order already taken"))
        }
        c if c.starts_with("submissions.") => Some((
            ConflictKind::DuplicateSubmission,
            "Submission already recorded",
        )),
        _ => None,
    }
}

fn map_postgres_constraint_to_conflict(error_msg: &str) -> Option<(ConflictKind, &'static str)> {
    if error_msg.contains("ux_games_room_code") {
        return Some((ConflictKind::RoomCodeTaken, "Room code already exists"));
    }
    if error_msg.contains("ux_players_game_turn_order") {
        return Some((ConflictKind::TurnOrderTaken, "Turn order already taken"));
    }
    if error_msg.contains("ux_submissions_game_round_player_phase") {
        return Some((
            ConflictKind::DuplicateSubmission,
            "Submission already recorded",
        ));
    }
    None
}

/// Translate a `DbErr` into a `DomainError`.
pub fn map_db_err(e: sea_orm::DbErr) -> DomainError {
    let error_msg = e.to_string();

    match &e {
        sea_orm::DbErr::RecordNotFound(what) => {
            return DomainError::not_found(NotFoundKind::Other("Record".into()), what.clone());
        }
        sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => {
            warn!(raw_error = %error_msg, "Database unavailable");
            return DomainError::infra(InfraErrorKind::DbUnavailable, "Database unavailable");
        }
        _ => {}
    }

    if mentions_sqlstate(&error_msg, "23505")
        || error_msg.contains("duplicate key value violates unique constraint")
        || error_msg.contains("UNIQUE constraint failed")
    {
        if let Some((kind, detail)) = extract_sqlite_columns(&error_msg)
            .and_then(map_sqlite_columns_to_conflict)
            .or_else(|| map_postgres_constraint_to_conflict(&error_msg))
        {
            return DomainError::conflict(kind, detail);
        }

        warn!(raw_error = %error_msg, "Unique constraint violation");
        return DomainError::conflict(
            ConflictKind::Other("Unique".into()),
            "Unique constraint violation",
        );
    }

    if mentions_sqlstate(&error_msg, "23503") || error_msg.contains("FOREIGN KEY constraint failed")
    {
        warn!(raw_error = %error_msg, "Foreign key constraint violation");
        return DomainError::validation_other("Foreign key constraint violation");
    }

    if error_msg.contains("timeout")
        || error_msg.contains("timed out")
        || error_msg.contains("database is locked")
        || error_msg.contains("pool")
        || error_msg.contains("unavailable")
        || mentions_sqlstate(&error_msg, "57014")
    {
        warn!(raw_error = %error_msg, "Database timeout or pool issue");
        return DomainError::infra(InfraErrorKind::Timeout, "Database timeout");
    }

    error!(raw_error = %error_msg, "Unhandled database error");
    DomainError::infra(
        InfraErrorKind::Other("DbErr".into()),
        "Database operation failed",
    )
}
