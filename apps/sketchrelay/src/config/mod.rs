pub mod client;
pub mod game;
