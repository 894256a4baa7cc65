// src/core/state/mod.rs

//! Defines the central `ServerState` struct and all related state components.

mod core;
mod registry;
mod stats;

pub use self::core::ServerState;
pub use registry::ConnectionRegistry;
pub use stats::StatsState;
