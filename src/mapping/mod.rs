//! Mapping sessions: pressure and location collected together, reduced to
//! the points worth keeping when the session ends.

pub mod collector;
pub mod commands;
pub mod config;
pub mod controller;
pub mod reducer;

pub use config::ReducerConfig;
pub use controller::{MappingController, MappingTiming};
