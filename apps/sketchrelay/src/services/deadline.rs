//! Per-client phase deadlines.
//!
//! A deadline is a start instant plus a duration, taken when this client first
//! observes a (round, phase). When it passes and the player still has not
//! submitted, exactly one automatic submission is made for them. Transient
//! store errors are retried; if the submission still fails, the next
//! observation of the same phase re-arms an already expired deadline.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::client::PhaseDurations;
use crate::domain::{GameCursor, Phase};
use crate::errors::domain::{DomainError, ValidationKind};
use crate::services::actions::{PlayerActions, SubmitMode};
use crate::services::retry::{bounded, RetryPolicy, Step};

type GateKey = (i32, Phase);

/// At most one local submission attempt per (round, phase).
#[derive(Debug, Clone, Default)]
pub struct SubmissionGate {
    claimed: Arc<Mutex<HashSet<GateKey>>>,
}

impl SubmissionGate {
    /// `true` for the first caller only.
    pub fn claim(&self, round: i32, phase: Phase) -> bool {
        self.claimed.lock().insert((round, phase))
    }

    /// Give the slot back after a failed attempt.
    pub fn release(&self, round: i32, phase: Phase) {
        self.claimed.lock().remove(&(round, phase));
    }

    pub fn is_claimed(&self, round: i32, phase: Phase) -> bool {
        self.claimed.lock().contains(&(round, phase))
    }
}

struct Armed {
    key: GateKey,
    generation: u64,
    deadline: Instant,
    cancel: CancellationToken,
    /// The automatic submission gave up; re-observing retries at once.
    failed: bool,
}

pub struct DeadlineDriver {
    actions: PlayerActions,
    gate: SubmissionGate,
    durations: PhaseDurations,
    policy: RetryPolicy,
    game_id: i64,
    player_id: i64,
    armed: Arc<Mutex<Option<Armed>>>,
    generation: Mutex<u64>,
    fired: Arc<Notify>,
}

impl DeadlineDriver {
    pub fn new(
        actions: PlayerActions,
        gate: SubmissionGate,
        durations: PhaseDurations,
        policy: RetryPolicy,
        game_id: i64,
        player_id: i64,
    ) -> Self {
        Self {
            actions,
            gate,
            durations,
            policy,
            game_id,
            player_id,
            armed: Arc::new(Mutex::new(None)),
            generation: Mutex::new(0),
            fired: Arc::new(Notify::new()),
        }
    }

    /// Signalled after every automatic submission.
    pub fn fired(&self) -> Arc<Notify> {
        self.fired.clone()
    }

    /// Arm for `cursor` if it is a phase not seen before. Re-observing the
    /// armed phase keeps the original deadline, unless its automatic
    /// submission failed, in which case it is re-armed already expired.
    /// Any other state cancels it. Returns whether a deadline was armed.
    pub fn observe(&self, cursor: GameCursor) -> bool {
        let mut armed = self.armed.lock();

        let Some(phase) = cursor.phase() else {
            if let Some(previous) = armed.take() {
                previous.cancel.cancel();
            }
            return false;
        };
        let key = (cursor.round, phase);
        let mut deadline = Instant::now() + self.durations.for_phase(phase);
        if let Some(current) = armed.as_ref().filter(|a| a.key == key) {
            if !current.failed {
                return false;
            }
            deadline = current.deadline;
        }
        if let Some(previous) = armed.take() {
            previous.cancel.cancel();
        }

        let generation = {
            let mut next = self.generation.lock();
            *next += 1;
            *next
        };
        let cancel = CancellationToken::new();
        *armed = Some(Armed {
            key,
            generation,
            deadline,
            cancel: cancel.clone(),
            failed: false,
        });

        let actions = self.actions.clone();
        let gate = self.gate.clone();
        let policy = self.policy;
        let fired = self.fired.clone();
        let slot = self.armed.clone();
        let (game_id, player_id) = (self.game_id, self.player_id);
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(game_id, player_id, round = key.0, phase = ?key.1, "deadline cancelled");
                }
                _ = sleep_until(deadline) => {
                    let outcome = bounded(&policy, "deadline_submit", |_| {
                        let (actions, gate) = (&actions, &gate);
                        async move {
                            auto_submit(actions, gate, game_id, player_id, key).await.map(Step::Done)
                        }
                    })
                    .await;
                    match outcome {
                        Ok(Some(true)) => fired.notify_one(),
                        Ok(Some(false)) => {}
                        Ok(None) => {
                            warn!(game_id, player_id, round = key.0, phase = ?key.1, "automatic submission retries exhausted");
                            mark_failed(&slot, generation);
                        }
                        Err(err) => {
                            warn!(game_id, player_id, error = %err, "automatic submission failed");
                            mark_failed(&slot, generation);
                        }
                    }
                }
            }
        });

        debug!(
            game_id = self.game_id,
            player_id = self.player_id,
            round = cursor.round,
            ?phase,
            secs = deadline.saturating_duration_since(Instant::now()).as_secs_f64(),
            "deadline armed"
        );
        true
    }

    /// Time left in the armed phase, computed from the start instant.
    pub fn remaining(&self) -> Option<Duration> {
        self.armed
            .lock()
            .as_ref()
            .map(|a| a.deadline.saturating_duration_since(Instant::now()))
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.armed.lock().take() {
            previous.cancel.cancel();
        }
    }
}

impl Drop for DeadlineDriver {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn mark_failed(slot: &Mutex<Option<Armed>>, generation: u64) {
    if let Some(armed) = slot.lock().as_mut().filter(|a| a.generation == generation) {
        armed.failed = true;
    }
}

/// Submit for the player unless they (or this client) already did.
/// Returns whether a submission was made.
async fn auto_submit(
    actions: &PlayerActions,
    gate: &SubmissionGate,
    game_id: i64,
    player_id: i64,
    (round, phase): GateKey,
) -> Result<bool, DomainError> {
    if !gate.claim(round, phase) {
        debug!(game_id, player_id, round, ?phase, "submission already in progress locally");
        return Ok(false);
    }

    let result: Result<bool, DomainError> = async {
        if actions.has_submitted(game_id, round, player_id, phase).await? {
            return Ok(false);
        }
        match phase {
            Phase::Prompt => {
                actions
                    .submit_prompt(game_id, round, player_id, "", SubmitMode::Deadline)
                    .await?
            }
            Phase::Drawing => {
                actions
                    .submit_drawing(game_id, round, player_id, SubmitMode::Deadline)
                    .await?
            }
        }
        Ok::<bool, DomainError>(true)
    }
    .await;

    match result {
        Ok(submitted) => {
            if submitted {
                info!(game_id, player_id, round, ?phase, "deadline passed, submitted automatically");
            }
            Ok(submitted)
        }
        Err(DomainError::Validation(ValidationKind::WrongPhase, _)) => {
            debug!(game_id, player_id, round, ?phase, "phase moved on before the deadline");
            Ok(false)
        }
        Err(err) => {
            gate.release(round, phase);
            Err(err)
        }
    }
}
