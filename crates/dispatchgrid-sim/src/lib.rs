//! dispatchgrid-sim — in-process simulation server.
//!
//! Plays the remote side of a scenario without a network hop: hands out
//! seeded calls, keeps ground-truth inventory, validates every dispatch,
//! and scores the run. Used by `dispatchd run` and by end-to-end tests.

pub mod simulation;

pub use simulation::{Simulation, seed_from_str};
