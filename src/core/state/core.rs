// src/core/state/core.rs

//! Defines the central `ServerState` struct, holding all shared server-wide state.

use super::registry::ConnectionRegistry;
use super::stats::StatsState;
use crate::config::Config;
use crate::core::protocol::WireProtocol;
use crate::core::store::{ContentStore, DiskImageStore, FileStore, MemoryStore, UserStore};
use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// The central struct holding all shared, server-wide state.
///
/// Built once at startup, wrapped in an `Arc` and passed to every connection
/// and handler. There are no process-wide statics besides metrics.
pub struct ServerState {
    /// The validated configuration the server was started with.
    pub config: Config,
    /// Framing, cipher and message parameters shared by every connection.
    pub wire: Arc<WireProtocol>,
    /// Every live connection, keyed by connection id.
    pub registry: ConnectionRegistry,
    pub users: Arc<dyn UserStore>,
    pub content: Arc<dyn ContentStore>,
    pub files: Arc<dyn FileStore>,
    pub stats: StatsState,
    /// Set once shutdown begins; read loops and the accept loop stop taking work.
    shutting_down: AtomicBool,
}

impl fmt::Debug for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerState")
            .field("connections", &self.registry.count())
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}

impl ServerState {
    /// Builds the state with stores chosen from the configuration: one
    /// in-memory store for users and content, and either the image directory
    /// or the same in-memory store for files.
    pub fn initialize(config: Config) -> Result<Arc<Self>> {
        let memory = Arc::new(MemoryStore::new());
        let files: Arc<dyn FileStore> = match &config.storage.images_dir {
            Some(dir) => {
                info!("Serving images from '{}'.", dir);
                Arc::new(DiskImageStore::new(
                    dir,
                    config.accounts.default_avatar.clone(),
                ))
            }
            None => {
                info!("No images directory configured; using the in-memory file catalog.");
                memory.clone()
            }
        };
        Self::with_stores(config, memory.clone(), memory, files)
    }

    /// Builds the state around caller-provided stores.
    pub fn with_stores(
        config: Config,
        users: Arc<dyn UserStore>,
        content: Arc<dyn ContentStore>,
        files: Arc<dyn FileStore>,
    ) -> Result<Arc<Self>> {
        let wire = Arc::new(config.wire_protocol()?);
        Ok(Arc::new(Self {
            config,
            wire,
            registry: ConnectionRegistry::new(),
            users,
            content,
            files,
            stats: StatsState::new(),
            shutting_down: AtomicBool::new(false),
        }))
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Marks the server as shutting down. Returns `false` if it already was.
    pub fn begin_shutdown(&self) -> bool {
        !self.shutting_down.swap(true, Ordering::AcqRel)
    }

    /// The avatar assigned to new accounts: the file store's default, else the
    /// configured fallback, else empty.
    pub async fn default_avatar_key(&self) -> String {
        match self.files.default_avatar_key().await {
            Some(key) => key,
            None => self.config.accounts.default_avatar.clone().unwrap_or_default(),
        }
    }
}
