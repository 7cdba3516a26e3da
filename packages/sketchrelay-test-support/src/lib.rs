//! Test support shared by the engine's unit and integration tests.

pub mod logging;
