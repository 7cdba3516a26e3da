//! Bounded retry with reconciliation.
//!
//! Every conditional write in the protocol follows the same shape: attempt the
//! write, and when it reports no change (or fails in a way that leaves the
//! outcome unknown) ask the store whether the desired state already holds.
//! Transient store errors are retried with exponential backoff; permanent
//! errors propagate on the first occurrence.

use std::future::Future;
use std::time::Duration;

use rand::random;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::domain::DomainError;

const JITTER_PERCENT: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Backoff after the given 1-based attempt, doubled each time and capped,
    /// with +/-20% jitter so racing clients spread out.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let base = self
            .initial_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
            .as_secs_f64();
        let jitter = (random::<f64>() * 2.0 - 1.0) * base * JITTER_PERCENT;
        Duration::from_secs_f64((base + jitter).max(0.0))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(250), Duration::from_secs(2))
    }
}

/// What one attempt decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Done(T),
    /// Not done yet; try again after backoff.
    Retry,
}

/// Run `step` up to `policy.max_attempts` times.
///
/// Returns `Ok(None)` when every attempt asked for a retry or failed
/// transiently. The closure receives the 1-based attempt number.
pub async fn bounded<T, F, Fut>(
    policy: &RetryPolicy,
    label: &'static str,
    mut step: F,
) -> Result<Option<T>, DomainError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Step<T>, DomainError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match step(attempt).await {
            Ok(Step::Done(value)) => return Ok(Some(value)),
            Ok(Step::Retry) => {
                debug!(op = label, attempt, "retry requested");
            }
            Err(err) if err.is_transient() => {
                warn!(op = label, attempt, error = %err, "transient store error");
            }
            Err(err) => return Err(err),
        }

        if attempt < max_attempts {
            sleep(policy.delay_for(attempt)).await;
        }
    }

    debug!(op = label, attempts = max_attempts, "retries exhausted");
    Ok(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasResult {
    /// This call made the change.
    Applied,
    /// The change was made by someone else.
    AlreadyAchieved,
    /// The precondition no longer holds and the target was not reached.
    Lost,
}

impl CasResult {
    pub fn succeeded(self) -> bool {
        matches!(self, CasResult::Applied | CasResult::AlreadyAchieved)
    }
}

/// Attempt a conditional write, then reconcile when it did not apply.
///
/// A transient error from the write leaves its outcome unknown, so it is
/// reconciled the same way as a rejected write.
pub async fn cas_or_reconcile<W, R, RF>(write: W, achieved: RF) -> Result<CasResult, DomainError>
where
    W: Future<Output = Result<bool, DomainError>>,
    RF: FnOnce() -> R,
    R: Future<Output = Result<bool, DomainError>>,
{
    match write.await {
        Ok(true) => return Ok(CasResult::Applied),
        Ok(false) => {}
        Err(err) if err.is_transient() => {
            warn!(error = %err, "conditional write outcome unknown, reconciling");
        }
        Err(err) => return Err(err),
    }

    if achieved().await? {
        Ok(CasResult::AlreadyAchieved)
    } else {
        Ok(CasResult::Lost)
    }
}
