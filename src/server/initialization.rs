// src/server/initialization.rs

//! Handles server initialization: state construction, account seeding and
//! binding the listener.

use super::context::ServerContext;
use crate::config::Config;
use crate::core::session::credentials::{hash_password, is_acceptable};
use crate::core::state::ServerState;
use crate::core::store::{NewUser, Role};
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::info;

/// Initializes all server components before starting the main loop.
pub async fn setup(config: Config) -> Result<ServerContext> {
    log_startup_info(&config);
    let state = ServerState::initialize(config)?;
    info!("Server state initialized.");
    setup_with_state(state).await
}

/// Seeds accounts and binds the listener for an already-built state.
pub async fn setup_with_state(state: Arc<ServerState>) -> Result<ServerContext> {
    seed_owner(&state).await?;

    let (host, port) = (state.config.host.as_str(), state.config.port);
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;
    info!("Scriptorium server listening on {}", listener.local_addr()?);

    let (shutdown_tx, _) = broadcast::channel(1);
    Ok(ServerContext {
        state,
        listener,
        shutdown_tx,
        background_tasks: JoinSet::new(),
    })
}

/// Creates the configured owner account unless its login already exists.
async fn seed_owner(state: &ServerState) -> Result<()> {
    let accounts = &state.config.accounts;
    let (Some(login), Some(password)) = (&accounts.owner_login, &accounts.owner_password) else {
        return Ok(());
    };
    if !is_acceptable(login, password) {
        return Err(anyhow!(
            "accounts.owner_login/owner_password do not satisfy the credential rules"
        ));
    }
    if state.users.is_login_taken(login).await {
        info!("Owner account '{}' already exists.", login);
        return Ok(());
    }

    let owner = NewUser {
        login: login.clone(),
        password_hash: hash_password(password),
        nickname: login.clone(),
        avatar_id: state.default_avatar_key().await,
        role_id: Role::Owner.id(),
        fixed_key: String::new(),
    };
    if !state.users.create_user(owner).await {
        return Err(anyhow!("Failed to create owner account '{login}'"));
    }
    info!("Created owner account '{}'.", login);
    Ok(())
}

/// Logs key configuration parameters at startup.
fn log_startup_info(config: &Config) {
    info!(
        "Protocol: chunk size {}, delimiter '{}'.",
        config.protocol.chunk_size, config.protocol.delimiter
    );
    info!("Client limit set to {}.", config.max_clients);
    match &config.storage.images_dir {
        Some(dir) => info!("Images directory: {}", dir),
        None => info!("No images directory configured."),
    }
}
