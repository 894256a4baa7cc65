// src/core/protocol/cipher.rs

//! Whole-message symmetric encryption: AES-256 in CBC mode with PKCS#7 padding,
//! base64 on the wire.
//!
//! Key and IV are pre-shared and identical for every connection. That keeps the
//! server wire-compatible with existing clients, but it only hides traffic from
//! passive observers: anyone holding a client binary holds the key, and a fixed
//! IV makes equal plaintexts produce equal ciphertexts. Treat this layer as
//! obfuscation, not as transport security.

use crate::core::ScriptoriumError;
use aes::Aes256;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use std::fmt;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Key length in bytes.
pub const KEY_LEN: usize = 32;
/// IV length in bytes.
pub const IV_LEN: usize = 16;

/// The key shipped with the existing client builds.
pub const LEGACY_KEY: &[u8; KEY_LEN] = b"KiJvHecdyYCeM2llswHEmQfICiUtdlxk";
/// The IV shipped with the existing client builds.
pub const LEGACY_IV: &[u8; IV_LEN] = b"U9htdlFa3As7n9nD";

/// Encrypts and decrypts complete logical messages.
#[derive(Clone)]
pub struct MessageCipher {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageCipher").finish_non_exhaustive()
    }
}

impl Default for MessageCipher {
    fn default() -> Self {
        Self::new(*LEGACY_KEY, *LEGACY_IV)
    }
}

impl MessageCipher {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Builds a cipher from raw key material, checking the lengths.
    pub fn from_slices(key: &[u8], iv: &[u8]) -> Result<Self, ScriptoriumError> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            ScriptoriumError::InvalidConfig(format!(
                "cipher key must be {KEY_LEN} bytes, got {}",
                key.len()
            ))
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
            ScriptoriumError::InvalidConfig(format!(
                "cipher IV must be {IV_LEN} bytes, got {}",
                iv.len()
            ))
        })?;
        Ok(Self::new(key, iv))
    }

    /// Encrypts a UTF-8 plaintext and returns it base64-encoded.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        BASE64.encode(ciphertext)
    }

    /// Reverses [`MessageCipher::encrypt`]. Fails with `ScriptoriumError::Decode`
    /// when the input is not base64, not a whole number of blocks, carries bad
    /// padding, or does not decrypt to UTF-8.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, ScriptoriumError> {
        let raw = BASE64.decode(ciphertext.trim())?;
        let plaintext = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| ScriptoriumError::Decode("invalid ciphertext or padding".into()))?;
        Ok(String::from_utf8(plaintext)?)
    }
}
