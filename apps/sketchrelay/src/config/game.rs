//! Fixed game rules. These are protocol constants shared by every client,
//! so they are compiled in rather than read from the environment.

use std::time::Duration;

/// Time allowed for the prompt phase, measured from when a client first sees it.
pub const PROMPT_PHASE: Duration = Duration::from_secs(60);
/// Time allowed for the drawing phase.
pub const DRAWING_PHASE: Duration = Duration::from_secs(180);

pub const FRAMES_PER_ROUND_OPTIONS: [i16; 3] = [3, 5, 8];
pub const DEFAULT_FRAMES_PER_ROUND: i16 = 5;

pub const MAX_PLAYERS: usize = 10;
pub const MIN_PLAYERS_TO_START: usize = 2;

pub const MAX_NICKNAME_CHARS: usize = 20;
pub const MAX_PROMPT_CHARS: usize = 100;

pub fn is_valid_frames_per_round(frames: i16) -> bool {
    FRAMES_PER_ROUND_OPTIONS.contains(&frames)
}
