// src/main.rs

//! The main entry point for the Scriptorium session server.

use anyhow::{Result, anyhow};
use scriptorium::config::Config;
use scriptorium::server;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*, reload};

#[tokio::main]
async fn main() -> Result<()> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("Scriptorium version {VERSION}");
        return Ok(());
    }

    // Logging starts before the config is read so load errors are reported
    // through the same subscriber; the filter is swapped once the config is known.
    let rust_log = env::var("RUST_LOG").ok();
    let (filter, reload_handle) = reload::Layer::new(EnvFilter::new(
        rust_log.as_deref().unwrap_or("info"),
    ));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact() // Use the compact, single-line format.
                .with_ansi(true), // Enable ANSI color codes for log levels.
        )
        .init();

    let config_path = args
        .iter()
        .position(|arg| arg == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
        .unwrap_or("config.toml");

    let mut config = match Config::from_file(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration from \"{config_path}\": {e:#}");
            return Err(e);
        }
    };

    if let Some(port_index) = args.iter().position(|arg| arg == "--port") {
        let port_str = args
            .get(port_index + 1)
            .ok_or_else(|| anyhow!("--port flag requires a value"))?;
        config.port = match port_str.parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => return Err(anyhow!("Invalid port number: {port_str}")),
        };
    }

    if rust_log.is_none() {
        reload_handle
            .modify(|filter| *filter = EnvFilter::new(&config.log_level))
            .map_err(|e| anyhow!("Failed to apply log level '{}': {e}", config.log_level))?;
    }

    info!("Starting Scriptorium {VERSION}.");
    if let Err(e) = server::run(config).await {
        error!("Server runtime error: {}", e);
        return Err(e);
    }

    Ok(())
}
