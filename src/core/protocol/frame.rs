// src/core/protocol/frame.rs

//! Implements the line-oriented chunk framing used on the wire, as a
//! `tokio_util::codec` `Decoder`/`Encoder` pair.
//!
//! A logical payload travels as one or more chunk lines followed by a sentinel:
//!
//! ```text
//! ~chunk~<first 32768 characters>
//! ~chunk~<next characters>
//! ~end~
//! ```
//!
//! The payload itself must not contain a line break. Ciphertext is base64, so
//! this holds for everything the server sends.

use crate::core::ScriptoriumError;
use bytes::{Buf, BytesMut};
use std::borrow::Cow;
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Maximum number of characters carried by one chunk line.
pub const DEFAULT_CHUNK_SIZE: usize = 32_768;
/// Prefix of every chunk line.
pub const DEFAULT_CHUNK_MARKER: &str = "~chunk~";
/// The line that closes a frame.
pub const DEFAULT_END_MARKER: &str = "~end~";

/// Reassembles chunk lines into complete payloads and splits outgoing payloads
/// into chunk lines.
#[derive(Debug, Clone)]
pub struct ChunkFrameCodec {
    chunk_size: usize,
    chunk_marker: String,
    end_marker: String,
    /// Payload accumulated from chunk lines since the last sentinel.
    pending: String,
    /// Offset into the read buffer already scanned for a line break.
    scan_offset: usize,
}

impl Default for ChunkFrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_MARKER, DEFAULT_END_MARKER)
    }
}

impl ChunkFrameCodec {
    /// Creates a codec with explicit framing parameters. A `chunk_size` of zero
    /// is treated as one.
    pub fn new(chunk_size: usize, chunk_marker: &str, end_marker: &str) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_marker: chunk_marker.to_string(),
            end_marker: end_marker.to_string(),
            pending: String::new(),
            scan_offset: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Applies one complete line (without its terminator) to the reassembly state.
    /// Returns the finished payload when the line is the sentinel.
    fn apply_line(&mut self, raw: &[u8]) -> Option<String> {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line: Cow<'_, str> = String::from_utf8_lossy(raw);

        if line == self.end_marker.as_str() {
            return Some(std::mem::take(&mut self.pending));
        }
        if let Some(data) = line.strip_prefix(self.chunk_marker.as_str()) {
            self.pending.push_str(data);
        } else {
            trace!("Ignoring line that is neither a chunk nor a sentinel");
        }
        None
    }
}

impl Decoder for ChunkFrameCodec {
    type Item = String;
    type Error = ScriptoriumError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let Some(pos) = src[self.scan_offset..].iter().position(|b| *b == b'\n') else {
                self.scan_offset = src.len();
                return Ok(None);
            };
            let line_end = self.scan_offset + pos;
            self.scan_offset = 0;

            let line = src.split_to(line_end);
            src.advance(1);

            if let Some(payload) = self.apply_line(&line) {
                return Ok(Some(payload));
            }
        }
    }

    /// A final line without a terminator is still a line. Chunks that never saw
    /// a sentinel are discarded.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload) = self.decode(src)? {
            return Ok(Some(payload));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let line = src.split_to(src.len());
        self.scan_offset = 0;
        Ok(self.apply_line(&line))
    }
}

impl Encoder<String> for ChunkFrameCodec {
    type Error = ScriptoriumError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let marker_len = self.chunk_marker.len() + 1;
        dst.reserve(item.len() + marker_len * (item.len() / self.chunk_size + 1) + self.end_marker.len() + 1);

        for chunk in split_chunks(&item, self.chunk_size) {
            dst.extend_from_slice(self.chunk_marker.as_bytes());
            dst.extend_from_slice(chunk.as_bytes());
            dst.extend_from_slice(b"\n");
        }
        dst.extend_from_slice(self.end_marker.as_bytes());
        dst.extend_from_slice(b"\n");
        Ok(())
    }
}

/// Splits `payload` into consecutive pieces of at most `chunk_size` characters.
/// An empty payload yields no pieces.
pub fn split_chunks(payload: &str, chunk_size: usize) -> impl Iterator<Item = &str> {
    let chunk_size = chunk_size.max(1);
    let mut rest = payload;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = rest
            .char_indices()
            .nth(chunk_size)
            .map_or(rest.len(), |(idx, _)| idx);
        let (head, tail) = rest.split_at(end);
        rest = tail;
        Some(head)
    })
}
