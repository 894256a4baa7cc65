// src/core/protocol/wire.rs

//! Bundles the three protocol layers (framing, encryption, message model) into
//! one value that is shared by every connection.

use super::cipher::MessageCipher;
use super::frame::ChunkFrameCodec;
use super::message::Message;
use crate::config::ProtocolConfig;
use crate::core::ScriptoriumError;

/// Everything needed to turn a `Message` into a frame payload and back.
#[derive(Debug, Clone)]
pub struct WireProtocol {
    cipher: MessageCipher,
    delimiter: String,
    chunk_size: usize,
    chunk_marker: String,
    end_marker: String,
}

impl Default for WireProtocol {
    fn default() -> Self {
        Self::new(MessageCipher::default(), &ProtocolConfig::default())
    }
}

impl WireProtocol {
    pub fn new(cipher: MessageCipher, protocol: &ProtocolConfig) -> Self {
        Self {
            cipher,
            delimiter: protocol.delimiter.clone(),
            chunk_size: protocol.chunk_size,
            chunk_marker: protocol.chunk_marker.clone(),
            end_marker: protocol.end_marker.clone(),
        }
    }

    /// A fresh codec instance. Each connection half owns its own, since the
    /// decoder carries reassembly state.
    pub fn codec(&self) -> ChunkFrameCodec {
        ChunkFrameCodec::new(self.chunk_size, &self.chunk_marker, &self.end_marker)
    }

    pub fn cipher(&self) -> &MessageCipher {
        &self.cipher
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Serializes and encrypts a message into a frame payload.
    pub fn seal(&self, message: &Message) -> String {
        self.cipher.encrypt(&message.serialize(&self.delimiter))
    }

    /// Decrypts and parses a frame payload.
    pub fn open(&self, payload: &str) -> Result<Message, ScriptoriumError> {
        let plaintext = self.cipher.decrypt(payload)?;
        Ok(Message::parse(&plaintext, &self.delimiter))
    }
}
