// src/core/errors.rs

//! Defines the primary error type for the session server.

use std::num::ParseIntError;
use std::sync::Arc;
use thiserror::Error;

/// The main error enum, covering every failure the protocol engine can surface.
///
/// Most of these never reach a client: the wire protocol has no error frame, so
/// the read loop logs them and either drops the message or tears the connection down.
#[derive(Error, Debug)]
pub enum ScriptoriumError {
    /// Transport failure on the socket. Fatal for the connection it occurred on.
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    /// A frame could not be turned back into a plaintext message (bad base64,
    /// bad padding, invalid UTF-8). Fatal only for the message.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Connection is closed")]
    Closed,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Value is not an integer or out of range")]
    NotAnInteger,

    #[error("Wrong number of arguments for '{0}' command")]
    WrongArgumentCount(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),
}

// `std::io::Error` is not `Clone`, so it is shared behind an `Arc`.
impl Clone for ScriptoriumError {
    fn clone(&self) -> Self {
        match self {
            ScriptoriumError::Io(e) => ScriptoriumError::Io(Arc::clone(e)),
            ScriptoriumError::Decode(s) => ScriptoriumError::Decode(s.clone()),
            ScriptoriumError::Closed => ScriptoriumError::Closed,
            ScriptoriumError::Store(s) => ScriptoriumError::Store(s.clone()),
            ScriptoriumError::InvalidConfig(s) => ScriptoriumError::InvalidConfig(s.clone()),
            ScriptoriumError::NotAnInteger => ScriptoriumError::NotAnInteger,
            ScriptoriumError::WrongArgumentCount(s) => {
                ScriptoriumError::WrongArgumentCount(s.clone())
            }
            ScriptoriumError::InvalidArgument(s) => ScriptoriumError::InvalidArgument(s.clone()),
            ScriptoriumError::Internal(s) => ScriptoriumError::Internal(s.clone()),
        }
    }
}

impl PartialEq for ScriptoriumError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScriptoriumError::Io(e1), ScriptoriumError::Io(e2)) => e1.kind() == e2.kind(),
            (ScriptoriumError::Decode(s1), ScriptoriumError::Decode(s2)) => s1 == s2,
            (ScriptoriumError::Store(s1), ScriptoriumError::Store(s2)) => s1 == s2,
            (ScriptoriumError::InvalidConfig(s1), ScriptoriumError::InvalidConfig(s2)) => s1 == s2,
            (ScriptoriumError::Internal(s1), ScriptoriumError::Internal(s2)) => s1 == s2,
            (ScriptoriumError::WrongArgumentCount(s1), ScriptoriumError::WrongArgumentCount(s2)) => {
                s1 == s2
            }
            (ScriptoriumError::InvalidArgument(s1), ScriptoriumError::InvalidArgument(s2)) => {
                s1 == s2
            }
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl ScriptoriumError {
    /// True for transport errors that mean "the peer went away" rather than a fault.
    pub fn is_normal_disconnect(&self) -> bool {
        matches!(self, ScriptoriumError::Closed)
            || matches!(self, ScriptoriumError::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
            ))
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for ScriptoriumError {
    fn from(e: std::io::Error) -> Self {
        ScriptoriumError::Io(Arc::new(e))
    }
}

impl From<base64::DecodeError> for ScriptoriumError {
    fn from(e: base64::DecodeError) -> Self {
        ScriptoriumError::Decode(format!("invalid base64: {e}"))
    }
}

impl From<std::string::FromUtf8Error> for ScriptoriumError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        ScriptoriumError::Decode(format!("plaintext is not UTF-8: {e}"))
    }
}

impl From<ParseIntError> for ScriptoriumError {
    fn from(_: ParseIntError) -> Self {
        ScriptoriumError::NotAnInteger
    }
}

impl From<serde_json::Error> for ScriptoriumError {
    fn from(e: serde_json::Error) -> Self {
        ScriptoriumError::Internal(format!("JSON serialization/deserialization error: {e}"))
    }
}
