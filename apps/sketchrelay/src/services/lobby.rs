//! Creating, joining and starting games.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::game::{
    is_valid_frames_per_round, FRAMES_PER_ROUND_OPTIONS, MAX_NICKNAME_CHARS, MAX_PLAYERS,
    MIN_PLAYERS_TO_START,
};
use crate::domain::phase::{first_cursor, reached};
use crate::domain::{Game, GameCursor, GameStatus, Player};
use crate::errors::domain::{ConflictKind, DomainError, NotFoundKind, ValidationKind};
use crate::services::retry::{bounded, cas_or_reconcile, CasResult, RetryPolicy, Step};
use crate::services::transitions::ensure_round;
use crate::store::{CursorUpdate, GameStore, NewPlayer};
use crate::utils::room_code::{generate_room_code, normalize_room_code};

const ROOM_CODE_ATTEMPTS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedGame {
    pub game: Game,
    pub host: Player,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinedGame {
    pub game: Game,
    pub player: Player,
}

#[derive(Clone)]
pub struct Lobby {
    store: Arc<dyn GameStore>,
    policy: RetryPolicy,
}

impl Lobby {
    pub fn new(store: Arc<dyn GameStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn create_game(
        &self,
        nickname: &str,
        frames_per_round: i16,
    ) -> Result<CreatedGame, DomainError> {
        let nickname = validate_nickname(nickname)?;
        if !is_valid_frames_per_round(frames_per_round) {
            return Err(DomainError::validation(
                ValidationKind::InvalidFramesPerRound,
                format!("Frames per round must be one of {FRAMES_PER_ROUND_OPTIONS:?}"),
            ));
        }

        let mut game = None;
        for attempt in 1..=ROOM_CODE_ATTEMPTS {
            let code = normalize_room_code(&generate_room_code());
            match self.store.insert_game(&code, frames_per_round).await {
                Ok(created) => {
                    game = Some(created);
                    break;
                }
                Err(DomainError::Conflict(ConflictKind::RoomCodeTaken, _)) => {
                    debug!(attempt, "room code taken, regenerating");
                }
                Err(err) => return Err(err),
            }
        }
        let game = game.ok_or_else(|| {
            DomainError::conflict(
                ConflictKind::RoomCodeTaken,
                "Could not allocate a free room code",
            )
        })?;

        let host = self
            .store
            .insert_player(NewPlayer {
                game_id: game.id,
                nickname,
                turn_order: 1,
                is_host: true,
            })
            .await?;

        info!(game_id = game.id, room_code = %game.room_code, player_id = host.id, "game created");
        Ok(CreatedGame { game, host })
    }

    pub async fn join_game(&self, room_code: &str, nickname: &str) -> Result<JoinedGame, DomainError> {
        let nickname = validate_nickname(nickname)?;
        let code = normalize_room_code(room_code);
        if code.is_empty() {
            return Err(DomainError::validation(
                ValidationKind::InvalidRoomCode,
                "Room code is required",
            ));
        }

        let join_policy = RetryPolicy::new(
            MAX_PLAYERS as u32,
            Duration::from_millis(10),
            self.policy.max_delay,
        );
        let store = self.store.as_ref();
        let code = code.as_str();
        let nickname = nickname.as_str();

        let joined = bounded(&join_policy, "join_game", |attempt| async move {
            let game = store.find_game_by_room_code(code).await?.ok_or_else(|| {
                DomainError::not_found(NotFoundKind::Game, format!("No game with room code '{code}'"))
            })?;
            if game.status != GameStatus::Lobby {
                return Err(DomainError::validation(
                    ValidationKind::GameAlreadyStarted,
                    "Game has already started",
                ));
            }

            let roster = store.list_players(game.id).await?;
            if roster.len() >= MAX_PLAYERS {
                return Err(DomainError::validation(
                    ValidationKind::GameFull,
                    format!("Game is full ({MAX_PLAYERS} players max)"),
                ));
            }

            let turn_order = roster.iter().map(|p| p.turn_order).max().unwrap_or(0) + 1;
            let inserted = store
                .insert_player(NewPlayer {
                    game_id: game.id,
                    nickname: nickname.to_string(),
                    turn_order,
                    is_host: false,
                })
                .await;

            match inserted {
                Ok(player) => Ok(Step::Done(JoinedGame { game, player })),
                Err(DomainError::Conflict(ConflictKind::TurnOrderTaken, _)) => {
                    debug!(game_id = game.id, turn_order, attempt, "turn order taken, re-reading roster");
                    Ok(Step::Retry)
                }
                Err(err) => Err(err),
            }
        })
        .await?;

        let joined = joined.ok_or_else(|| {
            DomainError::conflict(
                ConflictKind::TurnOrderTaken,
                "Too many players joined at once; try again",
            )
        })?;
        info!(
            game_id = joined.game.id,
            player_id = joined.player.id,
            turn_order = joined.player.turn_order,
            "player joined"
        );
        Ok(joined)
    }

    /// Fix the round count at the current player count and open round 1.
    pub async fn start_game(&self, game_id: i64, requester: i64) -> Result<Game, DomainError> {
        let store = self.store.as_ref();
        let game = fetch_game(store, game_id).await?;
        let roster = store.list_players(game_id).await?;

        let Some(me) = roster.iter().find(|p| p.id == requester) else {
            return Err(DomainError::validation(
                ValidationKind::NotInGame,
                "You are not in this game",
            ));
        };
        if !me.is_host {
            return Err(DomainError::validation(
                ValidationKind::NotHost,
                "Only the host can start the game",
            ));
        }
        if game.status != GameStatus::Lobby {
            return Err(DomainError::validation(
                ValidationKind::GameAlreadyStarted,
                "Game has already started",
            ));
        }
        if roster.len() < MIN_PLAYERS_TO_START {
            return Err(DomainError::validation(
                ValidationKind::NotEnoughPlayers,
                format!("At least {MIN_PLAYERS_TO_START} players are needed to start"),
            ));
        }

        ensure_round(store, game_id, 1).await?;

        let total_rounds = roster.len() as i32;
        let target = first_cursor();
        let update = CursorUpdate::to(target).with_total_rounds(total_rounds);

        let started = bounded(&self.policy, "start_game", |_| async move {
            let result = cas_or_reconcile(
                store.compare_and_set_cursor(game_id, GameCursor::lobby(), update),
                || async move {
                    let now = fetch_game(store, game_id).await?.cursor();
                    Ok(reached(now, target))
                },
            )
            .await?;
            Ok(if result.succeeded() {
                Step::Done(result)
            } else {
                Step::Retry
            })
        })
        .await?;

        match started {
            Some(CasResult::Applied) => {
                info!(game_id, total_rounds, "game started");
            }
            Some(_) => {
                warn!(game_id, "game was already started concurrently");
            }
            None => {
                return Err(DomainError::conflict(
                    ConflictKind::Other("StartRace".into()),
                    "Game could not be started; try again",
                ));
            }
        }

        fetch_game(store, game_id).await
    }
}

async fn fetch_game(store: &dyn GameStore, game_id: i64) -> Result<Game, DomainError> {
    store
        .get_game(game_id)
        .await?
        .ok_or_else(|| DomainError::not_found(NotFoundKind::Game, format!("Game {game_id} not found")))
}

fn validate_nickname(raw: &str) -> Result<String, DomainError> {
    let nickname = raw.trim();
    let chars = nickname.chars().count();
    if chars == 0 || chars > MAX_NICKNAME_CHARS {
        return Err(DomainError::validation(
            ValidationKind::InvalidNickname,
            format!("Nickname must be 1 to {MAX_NICKNAME_CHARS} characters"),
        ));
    }
    Ok(nickname.to_string())
}
