pub mod frames;
pub mod games;
pub mod players;
pub mod prompts;
pub mod rounds;
pub mod submissions;

pub use games::GameStatus;
pub use submissions::Phase;
