// src/core/protocol/mod.rs

//! The wire protocol: chunk framing, whole-message encryption, and the
//! delimited command model.

pub mod cipher;
pub mod frame;
pub mod message;
pub mod wire;

pub use cipher::MessageCipher;
pub use frame::ChunkFrameCodec;
pub use message::Message;
pub use wire::WireProtocol;
