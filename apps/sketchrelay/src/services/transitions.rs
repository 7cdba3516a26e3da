//! Quorum-driven phase transitions.
//!
//! Any client may call [`PhaseCoordinator::try_advance`] whenever it suspects
//! the current phase is finished. The only write is a compare-and-swap on the
//! game's `(status, current_round)`, so for each phase exactly one caller
//! moves the cursor and every other caller observes that it moved.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::latest::authoritative_round;
use crate::domain::phase::{next_cursor, reached};
use crate::domain::{Game, GameCursor, GameStatus, Round};
use crate::errors::domain::{DomainError, NotFoundKind};
use crate::services::retry::{bounded, cas_or_reconcile, CasResult, RetryPolicy, Step};
use crate::services::submissions::{QuorumReport, SubmissionTracker};
use crate::store::{CursorUpdate, GameStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// This call moved the cursor.
    Advanced { from: GameCursor, to: GameCursor },
    /// Another client made the same move first.
    AdvancedElsewhere { to: GameCursor },
    /// Not everyone has submitted yet.
    Waiting(QuorumReport),
    /// The cursor moved between the quorum check and the write.
    Superseded {
        observed: GameCursor,
        current: GameCursor,
    },
    /// Lobby and complete are not advanced by quorum.
    NotActive(GameCursor),
    /// Lost every race; the next trigger tries again.
    GaveUp { attempts: u32 },
}

impl AdvanceOutcome {
    /// The cursor is known to have moved past the observed phase.
    pub fn moved(&self) -> bool {
        matches!(
            self,
            AdvanceOutcome::Advanced { .. }
                | AdvanceOutcome::AdvancedElsewhere { .. }
                | AdvanceOutcome::Superseded { .. }
        )
    }
}

#[derive(Clone)]
pub struct PhaseCoordinator {
    store: Arc<dyn GameStore>,
    tracker: SubmissionTracker,
    policy: RetryPolicy,
}

impl PhaseCoordinator {
    pub fn new(store: Arc<dyn GameStore>, policy: RetryPolicy) -> Self {
        Self {
            tracker: SubmissionTracker::new(store.clone(), policy),
            store,
            policy,
        }
    }

    pub async fn try_advance(&self, game_id: i64) -> Result<AdvanceOutcome, DomainError> {
        let store = self.store.as_ref();
        let outcome = bounded(&self.policy, "try_advance", |attempt| async move {
            let game = require_game(store, game_id).await?;
            let observed = game.cursor();
            let (Some(phase), Some(target)) =
                (observed.phase(), next_cursor(observed, game.total_rounds))
            else {
                return Ok(Step::Done(AdvanceOutcome::NotActive(observed)));
            };

            let report = self
                .tracker
                .check_quorum(game_id, observed.round, phase)
                .await?;
            if !report.satisfied {
                return Ok(Step::Done(AdvanceOutcome::Waiting(report)));
            }

            let current = require_game(store, game_id).await?.cursor();
            if current != observed {
                debug!(game_id, %observed, %current, "cursor moved during quorum check");
                return Ok(Step::Done(AdvanceOutcome::Superseded { observed, current }));
            }

            if target.status == GameStatus::Prompt {
                ensure_round(store, game_id, target.round).await?;
            }

            let result = cas_or_reconcile(
                store.compare_and_set_cursor(game_id, observed, CursorUpdate::to(target)),
                || async move {
                    let now = require_game(store, game_id).await?.cursor();
                    Ok(reached(now, target))
                },
            )
            .await?;

            match result {
                CasResult::Applied => {
                    info!(game_id, from = %observed, to = %target, attempt, "phase advanced");
                    Ok(Step::Done(AdvanceOutcome::Advanced {
                        from: observed,
                        to: target,
                    }))
                }
                CasResult::AlreadyAchieved => {
                    debug!(game_id, to = %target, "phase advanced by another client");
                    Ok(Step::Done(AdvanceOutcome::AdvancedElsewhere { to: target }))
                }
                CasResult::Lost => Ok(Step::Retry),
            }
        })
        .await?;

        Ok(outcome.unwrap_or(AdvanceOutcome::GaveUp {
            attempts: self.policy.max_attempts.max(1),
        }))
    }
}

async fn require_game(store: &dyn GameStore, game_id: i64) -> Result<Game, DomainError> {
    store
        .get_game(game_id)
        .await?
        .ok_or_else(|| DomainError::not_found(NotFoundKind::Game, format!("Game {game_id} not found")))
}

/// Make sure a round row exists for `round_number` and return the
/// authoritative one.
///
/// Concurrent callers may each insert a row; readers resolve the duplicates
/// with the latest-wins rule, so this never fails because of them.
pub async fn ensure_round(
    store: &dyn GameStore,
    game_id: i64,
    round_number: i32,
) -> Result<Round, DomainError> {
    let existing = store.list_rounds(game_id, Some(round_number)).await?;
    if let Some(round) = authoritative_round(&existing, round_number) {
        return Ok(round.clone());
    }

    match store.insert_round(game_id, round_number).await {
        Ok(_) => {}
        Err(err) if err.is_conflict() => {
            debug!(game_id, round = round_number, "round created concurrently");
        }
        Err(err) => return Err(err),
    }

    let rows = store.list_rounds(game_id, Some(round_number)).await?;
    authoritative_round(&rows, round_number)
        .cloned()
        .ok_or_else(|| {
            DomainError::not_found(
                NotFoundKind::Round,
                format!("Round {round_number} of game {game_id} not found"),
            )
        })
}
