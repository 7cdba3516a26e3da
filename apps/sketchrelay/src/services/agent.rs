//! Who fills in a player's turns: a scripted bot or nobody at all.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::prelude::*;
use rand::rngs::StdRng;
use tokio::time::sleep;

use crate::domain::FrameContent;
use crate::errors::domain::DomainError;
use crate::services::actions::FrameAutosaver;

/// Input for writing a prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptTask<'a> {
    pub round: i32,
    /// The animation to caption; `None` when starting a chain.
    pub previous_animation: Option<&'a [FrameContent]>,
}

/// Input for drawing an animation.
#[derive(Debug, Clone, Copy)]
pub struct DrawTask<'a> {
    pub round: i32,
    pub frames_per_round: i16,
    pub prompt: Option<&'a str>,
}

#[async_trait]
pub trait PlayerAgent: Send + Sync {
    /// Text to submit, or `None` to leave it to the deadline.
    async fn write_prompt(&self, task: PromptTask<'_>) -> Option<String>;

    /// Draw through `canvas`. Returns whether the drawing should be submitted
    /// now; `false` leaves it to the deadline.
    async fn draw(&self, task: DrawTask<'_>, canvas: &FrameAutosaver) -> Result<bool, DomainError>;
}

const OPENERS: &[&str] = &[
    "a cat learning to juggle",
    "the moon eating spaghetti",
    "a robot watering its garden",
    "two snails racing",
    "a whale flying a kite",
    "a volcano sneezing",
    "a ghost doing laundry",
    "a penguin on a skateboard",
];

/// Scripted prompts and synthetic frames after a fixed think time.
pub struct BotAgent {
    think_time: Duration,
    rng: Mutex<StdRng>,
}

impl BotAgent {
    pub fn new(think_time: Duration, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            think_time,
            rng: Mutex::new(rng),
        }
    }
}

#[async_trait]
impl PlayerAgent for BotAgent {
    async fn write_prompt(&self, task: PromptTask<'_>) -> Option<String> {
        sleep(self.think_time).await;
        let text = match task.previous_animation {
            None => {
                let mut rng = self.rng.lock();
                OPENERS.choose(&mut *rng).copied().unwrap_or("a doodle").to_string()
            }
            Some([]) => format!("an empty canvas, round {}", task.round),
            Some(frames) => format!(
                "what happens next in {} frames, round {}",
                frames.len(),
                task.round
            ),
        };
        Some(text)
    }

    async fn draw(&self, task: DrawTask<'_>, canvas: &FrameAutosaver) -> Result<bool, DomainError> {
        let slots = task.frames_per_round.max(1);
        let per_frame = self.think_time / u32::from(slots.unsigned_abs());
        let subject = task.prompt.unwrap_or("nothing");

        for slot in 0..slots {
            sleep(per_frame).await;
            let stroke: u32 = self.rng.lock().random();
            canvas
                .record(slot, format!("stroke:{subject}:r{}:f{slot}:{stroke:08x}", task.round))
                .await?;
        }
        Ok(true)
    }
}

/// Never acts; every phase ends by deadline.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdleAgent;

#[async_trait]
impl PlayerAgent for IdleAgent {
    async fn write_prompt(&self, _task: PromptTask<'_>) -> Option<String> {
        None
    }

    async fn draw(&self, _task: DrawTask<'_>, _canvas: &FrameAutosaver) -> Result<bool, DomainError> {
        Ok(false)
    }
}
