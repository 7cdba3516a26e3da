//! Pure game rules: no I/O, no clocks, no randomness.

pub mod assignment;
pub mod chain;
pub mod latest;
pub mod model;
pub mod phase;
pub mod quorum;
pub mod rotation;

pub use crate::entities::{GameStatus, Phase};
pub use model::{FrameContent, Frame, Game, Player, Prompt, Round, Submission};
pub use phase::GameCursor;
