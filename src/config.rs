// src/config.rs

//! Manages server configuration: loading from TOML, defaults, and validation.

use crate::core::protocol::cipher::{IV_LEN, KEY_LEN, LEGACY_IV, LEGACY_KEY};
use crate::core::protocol::frame::{DEFAULT_CHUNK_MARKER, DEFAULT_CHUNK_SIZE, DEFAULT_END_MARKER};
use crate::core::protocol::message::DEFAULT_DELIMITER;
use crate::core::protocol::{MessageCipher, WireProtocol};
use crate::core::store::Role;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use tracing::warn;

/// Framing and message-model parameters. Changing any of these breaks
/// compatibility with existing clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProtocolConfig {
    /// Maximum characters per chunk line on outgoing frames.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_marker")]
    pub chunk_marker: String,
    #[serde(default = "default_end_marker")]
    pub end_marker: String,
    /// Separator between the command and each argument.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_marker: default_chunk_marker(),
            end_marker: default_end_marker(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_marker() -> String {
    DEFAULT_CHUNK_MARKER.to_string()
}
fn default_end_marker() -> String {
    DEFAULT_END_MARKER.to_string()
}
fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

/// The pre-shared key material. Both values are taken as raw UTF-8 bytes.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CipherConfig {
    #[serde(default = "default_cipher_key")]
    pub key: String,
    #[serde(default = "default_cipher_iv")]
    pub iv: String,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            key: default_cipher_key(),
            iv: default_cipher_iv(),
        }
    }
}

fn default_cipher_key() -> String {
    String::from_utf8_lossy(LEGACY_KEY).into_owned()
}
fn default_cipher_iv() -> String {
    String::from_utf8_lossy(LEGACY_IV).into_owned()
}

/// Account defaults and the optional bootstrap owner.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccountsConfig {
    /// Role id given to self-registered users.
    #[serde(default = "default_role")]
    pub default_role: i32,
    /// Avatar key used when the file store does not advertise a default avatar.
    #[serde(default)]
    pub default_avatar: Option<String>,
    /// When both are set, an owner account with these credentials is created at
    /// startup unless the login already exists.
    #[serde(default)]
    pub owner_login: Option<String>,
    #[serde(default, skip_serializing)]
    pub owner_password: Option<String>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            default_role: default_role(),
            default_avatar: None,
            owner_login: None,
            owner_password: None,
        }
    }
}

fn default_role() -> i32 {
    Role::ReadOnly.id()
}

/// Where file content (images) is served from.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct StorageConfig {
    /// Directory holding `<key>.png` / `<key>.gif` files and an `avatars/`
    /// sub-directory. When unset, the in-memory catalog is used.
    #[serde(default)]
    pub images_dir: Option<String>,
}

/// Configuration for the Prometheus metrics exporter.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    /// If true, an HTTP server will be started to expose Prometheus metrics.
    #[serde(default)]
    pub enabled: bool,
    /// The port for the Prometheus metrics server.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_port() -> u16 {
    8878
}

/// The validated server configuration.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_max_clients")]
    pub max_clients: usize,
    /// How long shutdown waits for connection tasks to finish.
    #[serde(with = "humantime_serde", default = "default_shutdown_grace")]
    pub shutdown_grace: Duration,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub cipher: CipherConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    12361
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_max_clients() -> usize {
    10_000
}
fn default_shutdown_grace() -> Duration {
    Duration::from_secs(10)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            max_clients: default_max_clients(),
            shutdown_grace: default_shutdown_grace(),
            protocol: ProtocolConfig::default(),
            cipher: CipherConfig::default(),
            accounts: AccountsConfig::default(),
            storage: StorageConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Loads and validates the configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at '{path}'"))?;
        Self::from_toml_str(&contents).with_context(|| format!("Invalid config in '{path}'"))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the shared wire protocol from the protocol and cipher sections.
    pub fn wire_protocol(&self) -> Result<WireProtocol> {
        let cipher =
            MessageCipher::from_slices(self.cipher.key.as_bytes(), self.cipher.iv.as_bytes())?;
        Ok(WireProtocol::new(cipher, &self.protocol))
    }

    /// Validates the configuration to ensure logical consistency.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow!("port cannot be 0"));
        }
        if self.host.trim().is_empty() {
            return Err(anyhow!("host cannot be empty"));
        }
        if self.max_clients == 0 {
            return Err(anyhow!("max_clients cannot be 0"));
        }

        if self.protocol.chunk_size == 0 {
            return Err(anyhow!("protocol.chunk_size cannot be 0"));
        }
        if self.protocol.delimiter.is_empty() {
            return Err(anyhow!("protocol.delimiter cannot be empty"));
        }
        if self.protocol.chunk_marker.is_empty() || self.protocol.end_marker.is_empty() {
            return Err(anyhow!("protocol markers cannot be empty"));
        }
        if self.protocol.end_marker.starts_with(&self.protocol.chunk_marker) {
            return Err(anyhow!(
                "protocol.end_marker must not start with protocol.chunk_marker"
            ));
        }

        if self.cipher.key.len() != KEY_LEN {
            return Err(anyhow!("cipher.key must be exactly {KEY_LEN} bytes"));
        }
        if self.cipher.iv.len() != IV_LEN {
            return Err(anyhow!("cipher.iv must be exactly {IV_LEN} bytes"));
        }
        if self.cipher.key.as_bytes() == LEGACY_KEY {
            warn!(
                "Using the legacy pre-shared cipher key. Traffic is only obscured from passive observers."
            );
        }

        if Role::from_id(self.accounts.default_role).is_none() {
            return Err(anyhow!(
                "accounts.default_role {} is not a known role id",
                self.accounts.default_role
            ));
        }
        if self.accounts.owner_login.is_some() != self.accounts.owner_password.is_some() {
            return Err(anyhow!(
                "accounts.owner_login and accounts.owner_password must be set together"
            ));
        }

        if self.metrics.enabled {
            if self.metrics.port == 0 {
                return Err(anyhow!("metrics.port cannot be 0"));
            }
            if self.metrics.port == self.port {
                return Err(anyhow!(
                    "metrics.port cannot be the same as the main server port"
                ));
            }
        }

        Ok(())
    }
}
