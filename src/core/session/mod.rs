// src/core/session/mod.rs

//! Per-session identity: connection ids, the authenticated principal, and the
//! credential rules applied before a principal is bound.

pub mod credentials;
mod id;
mod principal;

pub use id::ConnectionId;
pub use principal::Principal;
