//! `GameStore` backed by a SeaORM connection.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::adapters::frames_sea::{self, FrameCreate};
use crate::adapters::games_sea::{self, GameCreate, GameCursorSwap};
use crate::adapters::players_sea::{self, PlayerCreate};
use crate::adapters::{prompts_sea, rounds_sea, submissions_sea};
use crate::domain::{Frame, Game, GameCursor, Phase, Player, Prompt, Round, Submission};
use crate::errors::domain::DomainError;
use crate::infra::db_errors::map_db_err;
use crate::store::feed::{ChangeEvent, ChangeFeed, ChangeKind, ChangeStream};
use crate::store::{CursorUpdate, GameStore, NewFrame, NewPlayer};

#[derive(Clone)]
pub struct SeaStore {
    db: DatabaseConnection,
    feed: Option<Arc<dyn ChangeFeed>>,
}

impl SeaStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db, feed: None }
    }

    /// Announce every successful write on `feed`.
    pub fn with_feed(mut self, feed: Arc<dyn ChangeFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    async fn announce(&self, game_id: i64, kind: ChangeKind) {
        if let Some(feed) = &self.feed {
            feed.publish(ChangeEvent::new(game_id, kind)).await;
        }
    }
}

#[async_trait]
impl GameStore for SeaStore {
    async fn get_game(&self, game_id: i64) -> Result<Option<Game>, DomainError> {
        let model = games_sea::find_by_id(&self.db, game_id)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(Game::from))
    }

    async fn find_game_by_room_code(&self, room_code: &str) -> Result<Option<Game>, DomainError> {
        let model = games_sea::find_by_room_code(&self.db, room_code)
            .await
            .map_err(map_db_err)?;
        Ok(model.map(Game::from))
    }

    async fn insert_game(&self, room_code: &str, frames_per_round: i16) -> Result<Game, DomainError> {
        let model = games_sea::create_game(
            &self.db,
            GameCreate {
                room_code: room_code.to_string(),
                frames_per_round,
            },
        )
        .await
        .map_err(map_db_err)?;
        Ok(model.into())
    }

    async fn compare_and_set_cursor(
        &self,
        game_id: i64,
        expected: GameCursor,
        update: CursorUpdate,
    ) -> Result<bool, DomainError> {
        let applied = games_sea::compare_and_set_cursor(
            &self.db,
            GameCursorSwap {
                id: game_id,
                expected_status: expected.status,
                expected_round: expected.round,
                next_status: update.status,
                next_round: update.round,
                total_rounds: update.total_rounds,
            },
        )
        .await
        .map_err(map_db_err)?;

        if applied {
            self.announce(game_id, ChangeKind::Game).await;
        }
        Ok(applied)
    }

    async fn list_players(&self, game_id: i64) -> Result<Vec<Player>, DomainError> {
        let models = players_sea::list_by_game(&self.db, game_id)
            .await
            .map_err(map_db_err)?;
        Ok(models.into_iter().map(Player::from).collect())
    }

    async fn insert_player(&self, new: NewPlayer) -> Result<Player, DomainError> {
        let game_id = new.game_id;
        let model = players_sea::create_player(
            &self.db,
            PlayerCreate {
                game_id: new.game_id,
                nickname: new.nickname,
                turn_order: new.turn_order,
                is_host: new.is_host,
            },
        )
        .await
        .map_err(map_db_err)?;
        self.announce(game_id, ChangeKind::Player).await;
        Ok(model.into())
    }

    async fn list_rounds(
        &self,
        game_id: i64,
        round_number: Option<i32>,
    ) -> Result<Vec<Round>, DomainError> {
        let models = rounds_sea::list_by_game(&self.db, game_id, round_number)
            .await
            .map_err(map_db_err)?;
        Ok(models.into_iter().map(Round::from).collect())
    }

    async fn insert_round(&self, game_id: i64, round_number: i32) -> Result<Round, DomainError> {
        let model = rounds_sea::create_round(&self.db, game_id, round_number)
            .await
            .map_err(map_db_err)?;
        self.announce(game_id, ChangeKind::Round).await;
        Ok(model.into())
    }

    async fn upsert_prompt(
        &self,
        game_id: i64,
        round_number: i32,
        player_id: i64,
        text: &str,
    ) -> Result<(), DomainError> {
        prompts_sea::upsert_prompt(&self.db, game_id, round_number, player_id, text)
            .await
            .map_err(map_db_err)?;
        self.announce(game_id, ChangeKind::Prompt).await;
        Ok(())
    }

    async fn list_prompts(
        &self,
        game_id: i64,
        round_number: Option<i32>,
    ) -> Result<Vec<Prompt>, DomainError> {
        let models = prompts_sea::list_by_game(&self.db, game_id, round_number)
            .await
            .map_err(map_db_err)?;
        Ok(models.into_iter().map(Prompt::from).collect())
    }

    async fn insert_frame(&self, game_id: i64, new: NewFrame) -> Result<Frame, DomainError> {
        let model = frames_sea::create_frame(
            &self.db,
            FrameCreate {
                round_id: new.round_id,
                player_id: new.player_id,
                frame_number: new.frame_number,
                image_data: new.image_data,
            },
        )
        .await
        .map_err(map_db_err)?;
        self.announce(game_id, ChangeKind::Frame).await;
        Ok(model.into())
    }

    async fn list_frames(
        &self,
        round_ids: &[i64],
        player_id: Option<i64>,
    ) -> Result<Vec<Frame>, DomainError> {
        let models = frames_sea::list_by_rounds(&self.db, round_ids, player_id)
            .await
            .map_err(map_db_err)?;
        Ok(models.into_iter().map(Frame::from).collect())
    }

    async fn upsert_submission(
        &self,
        game_id: i64,
        round_number: i32,
        player_id: i64,
        phase: Phase,
    ) -> Result<(), DomainError> {
        submissions_sea::upsert_submission(&self.db, game_id, round_number, player_id, phase)
            .await
            .map_err(map_db_err)?;
        self.announce(game_id, ChangeKind::Submission).await;
        Ok(())
    }

    async fn list_submissions(
        &self,
        game_id: i64,
        round_number: i32,
        phase: Phase,
    ) -> Result<Vec<Submission>, DomainError> {
        let models = submissions_sea::list_for_phase(&self.db, game_id, round_number, phase)
            .await
            .map_err(map_db_err)?;
        Ok(models.into_iter().map(Submission::from).collect())
    }

    fn subscribe(&self, game_id: i64) -> Option<ChangeStream> {
        self.feed.as_ref().map(|feed| feed.subscribe(game_id))
    }
}
