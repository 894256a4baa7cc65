// src/core/session/id.rs

//! Connection identifiers.
//!
//! An id is 16 random alphanumeric characters followed by the 16-digit,
//! zero-padded Unix millisecond timestamp of the accept, so the connect time
//! can be read back from the id alone.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};
use std::fmt;

const RANDOM_LEN: usize = 16;
const TIMESTAMP_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generates a fresh id stamped with the current time.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let random: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(RANDOM_LEN)
            .map(char::from)
            .collect();
        let millis = at.timestamp_millis().max(0);
        Self(format!("{random}{millis:0width$}", width = TIMESTAMP_LEN))
    }

    /// The accept time encoded in the id, if it is well formed.
    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        let digits = self.0.get(self.0.len().checked_sub(TIMESTAMP_LEN)?..)?;
        let millis: i64 = digits.parse().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
