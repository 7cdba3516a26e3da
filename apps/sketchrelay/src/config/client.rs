use std::env;
use std::time::Duration;

use crate::config::game::{DRAWING_PHASE, PROMPT_PHASE};
use crate::entities::Phase;
use crate::error::AppError;
use crate::services::retry::RetryPolicy;

/// Phase deadlines. Production always uses the game constants; tests shrink them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseDurations {
    pub prompt: Duration,
    pub drawing: Duration,
}

impl PhaseDurations {
    pub fn for_phase(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Prompt => self.prompt,
            Phase::Drawing => self.drawing,
        }
    }
}

impl Default for PhaseDurations {
    fn default() -> Self {
        Self {
            prompt: PROMPT_PHASE,
            drawing: DRAWING_PHASE,
        }
    }
}

/// Per-process client tuning.
#[derive(Debug, Clone)]
pub struct ClientTuning {
    /// How often the game record is re-read when no change event arrives.
    pub poll_interval: Duration,
    /// Bound for store retries inside the tracker and coordinator.
    pub retry: RetryPolicy,
    pub durations: PhaseDurations,
    /// Minimum spacing between autosaves of one frame slot.
    pub autosave_interval: Duration,
}

impl Default for ClientTuning {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1_000),
            retry: RetryPolicy::default(),
            durations: PhaseDurations::default(),
            autosave_interval: Duration::from_millis(1_000),
        }
    }
}

impl ClientTuning {
    /// Defaults with `SKETCHRELAY_POLL_INTERVAL_MS` applied.
    pub fn from_env() -> Result<Self, AppError> {
        let mut tuning = Self::default();
        if let Ok(raw) = env::var("SKETCHRELAY_POLL_INTERVAL_MS") {
            let ms: u64 = raw.trim().parse().map_err(|_| {
                AppError::config(format!("SKETCHRELAY_POLL_INTERVAL_MS must be an integer, got '{raw}'"))
            })?;
            if ms == 0 {
                return Err(AppError::config("SKETCHRELAY_POLL_INTERVAL_MS must be positive"));
            }
            tuning.poll_interval = Duration::from_millis(ms);
        }
        Ok(tuning)
    }
}
