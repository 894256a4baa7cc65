// src/core/protocol/message.rs

//! The logical message model: a command name followed by positional arguments,
//! joined by a fixed delimiter token.
//!
//! There is no escaping. An argument that contains the delimiter will be split
//! into two arguments on the receiving side.

/// The delimiter used by existing clients.
pub const DEFAULT_DELIMITER: &str = "~sp~";

/// A decrypted command with its ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    command: String,
    args: Vec<String>,
}

impl Message {
    /// Creates a message with no arguments.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends one argument, builder style.
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Splits a plaintext payload on `delimiter`. The first segment is the
    /// command; an empty payload parses as an empty command with no arguments.
    pub fn parse(plaintext: &str, delimiter: &str) -> Self {
        let mut parts = plaintext.split(delimiter);
        let command = parts.next().unwrap_or_default().to_string();
        Self {
            command,
            args: parts.map(str::to_string).collect(),
        }
    }

    /// The exact inverse of [`Message::parse`].
    pub fn serialize(&self, delimiter: &str) -> String {
        let capacity = self.command.len()
            + self
                .args
                .iter()
                .map(|a| a.len() + delimiter.len())
                .sum::<usize>();
        let mut out = String::with_capacity(capacity);
        out.push_str(&self.command);
        for arg in &self.args {
            out.push_str(delimiter);
            out.push_str(arg);
        }
        out
    }

    /// The command exactly as received.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The command lowercased, for matching and for metric labels.
    pub fn name(&self) -> String {
        self.command.to_ascii_lowercase()
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, name: &str) -> bool {
        self.command.eq_ignore_ascii_case(name)
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arg_at(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }
}
