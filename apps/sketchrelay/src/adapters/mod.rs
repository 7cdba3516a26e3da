//! SeaORM adapters: free functions generic over `ConnectionTrait`, returning
//! `DbErr`. The store maps errors into `DomainError`.

pub mod frames_sea;
pub mod games_sea;
pub mod players_sea;
pub mod prompts_sea;
pub mod rounds_sea;
pub mod submissions_sea;
