//! Quorum checks for one (round, phase).

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::quorum::count_quorum;
use crate::domain::Phase;
use crate::errors::domain::DomainError;
use crate::services::retry::{bounded, RetryPolicy, Step};
use crate::store::GameStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuorumReport {
    pub game_id: i64,
    pub round_number: i32,
    pub phase: Phase,
    pub satisfied: bool,
    pub submitted_count: usize,
    pub player_count: usize,
    pub submitted_player_ids: Vec<i64>,
    pub missing_player_ids: Vec<i64>,
    /// The store kept failing transiently; the answer is "not yet", not "no".
    pub retries_exhausted: bool,
}

impl QuorumReport {
    fn unknown(game_id: i64, round_number: i32, phase: Phase) -> Self {
        Self {
            game_id,
            round_number,
            phase,
            satisfied: false,
            submitted_count: 0,
            player_count: 0,
            submitted_player_ids: Vec::new(),
            missing_player_ids: Vec::new(),
            retries_exhausted: true,
        }
    }
}

/// Read-only and safe to call from any number of clients at once.
#[derive(Clone)]
pub struct SubmissionTracker {
    store: Arc<dyn GameStore>,
    policy: RetryPolicy,
}

impl SubmissionTracker {
    pub fn new(store: Arc<dyn GameStore>, policy: RetryPolicy) -> Self {
        Self { store, policy }
    }

    pub async fn check_quorum(
        &self,
        game_id: i64,
        round_number: i32,
        phase: Phase,
    ) -> Result<QuorumReport, DomainError> {
        let outcome = bounded(&self.policy, "check_quorum", |_| async move {
            let roster = self.store.list_players(game_id).await?;
            let submissions = self
                .store
                .list_submissions(game_id, round_number, phase)
                .await?;
            Ok(Step::Done(count_quorum(
                &roster,
                submissions.iter().map(|s| s.player_id),
            )))
        })
        .await?;

        let Some(count) = outcome else {
            warn!(game_id, round = round_number, ?phase, "quorum check gave up after retries");
            return Ok(QuorumReport::unknown(game_id, round_number, phase));
        };

        if !count.strangers.is_empty() {
            warn!(
                game_id,
                round = round_number,
                ?phase,
                strangers = ?count.strangers,
                "ignoring submissions from players not in the game"
            );
        }

        let report = QuorumReport {
            game_id,
            round_number,
            phase,
            satisfied: count.satisfied(),
            submitted_count: count.submitted.len(),
            player_count: count.player_count,
            submitted_player_ids: count.submitted,
            missing_player_ids: count.missing,
            retries_exhausted: false,
        };
        debug!(
            game_id,
            round = round_number,
            ?phase,
            submitted = report.submitted_count,
            players = report.player_count,
            satisfied = report.satisfied,
            "quorum checked"
        );
        Ok(report)
    }
}
