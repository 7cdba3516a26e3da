//! Coordination services on top of the shared store.

pub mod actions;
pub mod agent;
pub mod assignments;
pub mod chains;
pub mod client;
pub mod deadline;
pub mod lobby;
pub mod retry;
pub mod submissions;
pub mod transitions;

pub use actions::{FrameAutosaver, PlayerActions, SubmitMode};
pub use agent::{BotAgent, IdleAgent, PlayerAgent};
pub use client::{ClientExit, GameClient};
pub use deadline::{DeadlineDriver, SubmissionGate};
pub use lobby::{CreatedGame, JoinedGame, Lobby};
pub use submissions::{QuorumReport, SubmissionTracker};
pub use transitions::{AdvanceOutcome, PhaseCoordinator};
