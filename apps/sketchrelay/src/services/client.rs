//! One player's view of a game, driven to completion.
//!
//! The loop wakes on the poll interval, on change events and on its own
//! deadline firing. Each wake re-reads the game, arms the deadline for a newly
//! seen phase, hands new work to the agent and asks the coordinator whether
//! the phase is done. Nothing here is authoritative; the store is.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::pending;
use futures::StreamExt;
use tokio::sync::Notify;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::client::ClientTuning;
use crate::domain::chain::Chain;
use crate::domain::{GameCursor, GameStatus};
use crate::errors::domain::{DomainError, NotFoundKind, ValidationKind};
use crate::services::actions::{FrameAutosaver, PlayerActions, SubmitMode};
use crate::services::agent::{DrawTask, PlayerAgent, PromptTask};
use crate::services::assignments::{load_task, TaskDetail};
use crate::services::chains::load_chains;
use crate::services::deadline::{DeadlineDriver, SubmissionGate};
use crate::services::transitions::{AdvanceOutcome, PhaseCoordinator};
use crate::store::{ChangeStream, GameStore};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientExit {
    Completed(Vec<Chain>),
    Cancelled,
}

pub struct GameClient {
    store: Arc<dyn GameStore>,
    game_id: i64,
    player_id: i64,
    agent: Arc<dyn PlayerAgent>,
    tuning: ClientTuning,
    coordinator: PhaseCoordinator,
    actions: PlayerActions,
    gate: SubmissionGate,
    deadline: DeadlineDriver,
    work_done: Arc<Notify>,
}

impl GameClient {
    pub fn new(
        store: Arc<dyn GameStore>,
        game_id: i64,
        player_id: i64,
        agent: Arc<dyn PlayerAgent>,
        tuning: ClientTuning,
    ) -> Self {
        let actions = PlayerActions::new(store.clone());
        let gate = SubmissionGate::default();
        let deadline = DeadlineDriver::new(
            actions.clone(),
            gate.clone(),
            tuning.durations,
            tuning.retry,
            game_id,
            player_id,
        );
        Self {
            coordinator: PhaseCoordinator::new(store.clone(), tuning.retry),
            store,
            game_id,
            player_id,
            agent,
            tuning,
            actions,
            gate,
            deadline,
            work_done: Arc::new(Notify::new()),
        }
    }

    pub fn deadline(&self) -> &DeadlineDriver {
        &self.deadline
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<ClientExit, DomainError> {
        let work_cancel = cancel.child_token();
        let result = self.drive(&cancel, &work_cancel).await;
        work_cancel.cancel();
        self.deadline.cancel();
        result
    }

    async fn drive(
        &self,
        cancel: &CancellationToken,
        work_cancel: &CancellationToken,
    ) -> Result<ClientExit, DomainError> {
        let mut feed: Option<ChangeStream> = self.store.subscribe(self.game_id);
        let fired = self.deadline.fired();
        let mut started: HashSet<GameCursor> = HashSet::new();

        info!(game_id = self.game_id, player_id = self.player_id, "client started");
        loop {
            if cancel.is_cancelled() {
                return Ok(ClientExit::Cancelled);
            }

            match self.tick(&mut started, work_cancel).await {
                Ok(Tick::Complete(chains)) => {
                    info!(game_id = self.game_id, player_id = self.player_id, "game complete");
                    return Ok(ClientExit::Completed(chains));
                }
                Ok(Tick::Moved) => continue,
                Ok(Tick::Idle) => {}
                Err(err) if err.is_transient() => {
                    warn!(game_id = self.game_id, player_id = self.player_id, error = %err, "store unavailable, will retry");
                }
                Err(err) => return Err(err),
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(ClientExit::Cancelled),
                _ = sleep(self.tuning.poll_interval) => {}
                _ = fired.notified() => {}
                _ = self.work_done.notified() => {}
                event = next_event(&mut feed) => {
                    if event.is_none() {
                        debug!(game_id = self.game_id, "change feed closed, polling only");
                        feed = None;
                    }
                }
            }
        }
    }

    async fn tick(
        &self,
        started: &mut HashSet<GameCursor>,
        work_cancel: &CancellationToken,
    ) -> Result<Tick, DomainError> {
        let game = self.store.get_game(self.game_id).await?.ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Game, format!("Game {} not found", self.game_id))
        })?;
        let cursor = game.cursor();

        if cursor.status == GameStatus::Complete {
            self.deadline.cancel();
            let chains = load_chains(self.store.as_ref(), self.game_id).await?;
            return Ok(Tick::Complete(chains));
        }

        self.deadline.observe(cursor);
        if cursor.phase().is_some() && started.insert(cursor) {
            self.spawn_work(cursor, work_cancel.child_token());
        }

        let outcome = self.coordinator.try_advance(self.game_id).await?;
        match &outcome {
            AdvanceOutcome::Waiting(report) => debug!(
                game_id = self.game_id,
                %cursor,
                submitted = report.submitted_count,
                players = report.player_count,
                "waiting for submissions"
            ),
            AdvanceOutcome::GaveUp { attempts } => {
                debug!(game_id = self.game_id, %cursor, attempts, "gave up advancing for now")
            }
            other => debug!(game_id = self.game_id, outcome = ?other, "advance attempted"),
        }

        Ok(if outcome.moved() { Tick::Moved } else { Tick::Idle })
    }

    fn spawn_work(&self, cursor: GameCursor, cancel: CancellationToken) {
        let work = AgentWork {
            store: self.store.clone(),
            actions: self.actions.clone(),
            gate: self.gate.clone(),
            agent: self.agent.clone(),
            tuning: self.tuning.clone(),
            game_id: self.game_id,
            player_id: self.player_id,
            cursor,
        };
        let done = self.work_done.clone();
        let (game_id, player_id) = (self.game_id, self.player_id);

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = work.perform() => {
                    match result {
                        Ok(true) => done.notify_one(),
                        Ok(false) => {}
                        Err(DomainError::Validation(ValidationKind::WrongPhase, _)) => {
                            debug!(game_id, %cursor, "phase moved on, discarding work");
                        }
                        Err(err) => {
                            warn!(game_id, player_id, %cursor, error = %err, "agent work failed");
                        }
                    }
                }
            }
        });
    }
}

enum Tick {
    Complete(Vec<Chain>),
    /// The cursor moved; look again right away.
    Moved,
    Idle,
}

async fn next_event(feed: &mut Option<ChangeStream>) -> Option<crate::store::ChangeEvent> {
    match feed.as_mut() {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}

/// The agent's turn for one (round, phase).
struct AgentWork {
    store: Arc<dyn GameStore>,
    actions: PlayerActions,
    gate: SubmissionGate,
    agent: Arc<dyn PlayerAgent>,
    tuning: ClientTuning,
    game_id: i64,
    player_id: i64,
    cursor: GameCursor,
}

impl AgentWork {
    /// Returns whether a submission was made.
    async fn perform(&self) -> Result<bool, DomainError> {
        let Some(phase) = self.cursor.phase() else {
            return Ok(false);
        };
        let round = self.cursor.round;
        if self
            .actions
            .has_submitted(self.game_id, round, self.player_id, phase)
            .await?
        {
            return Ok(false);
        }

        let task = load_task(self.store.as_ref(), self.game_id, self.player_id).await?;
        if task.cursor != self.cursor {
            return Ok(false);
        }

        match task.detail {
            TaskDetail::WritePrompt {
                round,
                previous_animation,
            } => {
                let Some(text) = self
                    .agent
                    .write_prompt(PromptTask {
                        round,
                        previous_animation: previous_animation.as_deref(),
                    })
                    .await
                else {
                    return Ok(false);
                };
                if !self.gate.claim(round, phase) {
                    return Ok(false);
                }
                let submitted = self
                    .actions
                    .submit_prompt(self.game_id, round, self.player_id, &text, SubmitMode::Manual)
                    .await;
                self.settle(round, submitted)
            }
            TaskDetail::Draw { round, prompt, .. } => {
                let canvas = FrameAutosaver::new(
                    self.actions.clone(),
                    self.game_id,
                    round,
                    self.player_id,
                    self.tuning.autosave_interval,
                );
                let ready = self
                    .agent
                    .draw(
                        DrawTask {
                            round,
                            frames_per_round: task.frames_per_round,
                            prompt: prompt.as_deref(),
                        },
                        &canvas,
                    )
                    .await?;
                canvas.flush().await?;
                if !ready || !self.gate.claim(round, phase) {
                    return Ok(false);
                }
                let submitted = self
                    .actions
                    .submit_drawing(self.game_id, round, self.player_id, SubmitMode::Manual)
                    .await;
                self.settle(round, submitted)
            }
            TaskDetail::Lobby | TaskDetail::Complete => Ok(false),
        }
    }

    /// Keep the gate claimed unless the submission can still be retried.
    fn settle(&self, round: i32, submitted: Result<(), DomainError>) -> Result<bool, DomainError> {
        match submitted {
            Ok(()) => Ok(true),
            Err(err @ DomainError::Validation(ValidationKind::WrongPhase, _)) => Err(err),
            Err(err) => {
                if let Some(phase) = self.cursor.phase() {
                    self.gate.release(round, phase);
                }
                Err(err)
            }
        }
    }
}
