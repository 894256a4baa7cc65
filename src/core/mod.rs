// src/core/mod.rs

//! The central module containing the wire protocol, session state and command
//! handlers of Scriptorium.

pub mod errors;
pub mod handler;
pub mod metrics;
pub mod protocol;
pub mod session;
pub mod state;
pub mod store;

pub use errors::ScriptoriumError;
pub use protocol::Message;
