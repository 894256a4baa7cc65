// src/connection/mod.rs

//! Manages the lifecycle of a single client TCP connection: the shared
//! `Connection` handle, its read loop, and cleanup on exit.

mod conn;
mod guard;
mod handler;

pub use conn::{BoxedWriter, Connection};
pub use guard::ConnectionGuard;
pub use handler::ConnectionHandler;
