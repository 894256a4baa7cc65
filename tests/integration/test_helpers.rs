// tests/integration/test_helpers.rs

//! Test helpers and utilities for integration tests

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use scriptorium::config::Config;
use scriptorium::connection::Connection;
use scriptorium::core::protocol::{ChunkFrameCodec, Message, WireProtocol};
use scriptorium::core::session::credentials::hash_password;
use scriptorium::core::state::ServerState;
use scriptorium::core::store::{MemoryStore, NewUser, Role, UserStore};
use scriptorium::server::open_connection;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// How long a client waits for an expected reply.
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(2);
/// How long a client listens before concluding that nothing was sent.
pub const SILENCE_WINDOW: Duration = Duration::from_millis(150);

/// TestContext provides a server state backed by a fresh in-memory store.
pub struct TestContext {
    pub state: Arc<ServerState>,
    pub store: Arc<MemoryStore>,
    shutdown_tx: broadcast::Sender<()>,
    next_port: std::sync::atomic::AtomicU16,
}

impl TestContext {
    /// Creates a new test context with default configuration
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a new test context with custom configuration
    pub fn with_config(config: Config) -> Self {
        // Initialize tracing (ignore error if already initialized)
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("warn"))
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();

        let store = Arc::new(MemoryStore::new());
        let state = ServerState::with_stores(config, store.clone(), store.clone(), store.clone())
            .expect("Failed to initialize server state");
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            state,
            store,
            shutdown_tx,
            next_port: std::sync::atomic::AtomicU16::new(40_000),
        }
    }

    /// Accepts a new in-process connection and spawns its read loop.
    pub fn connect(&self) -> TestClient {
        self.try_connect().expect("connection was rejected")
    }

    /// Like `connect`, but returns `None` when the server refuses the connection.
    pub fn try_connect(&self) -> Option<TestClient> {
        self.try_connect_with_buffer(256 * 1024)
    }

    /// Connects over a pipe that buffers at most `buffer` bytes each way.
    pub fn connect_with_buffer(&self, buffer: usize) -> TestClient {
        self.try_connect_with_buffer(buffer)
            .expect("connection was rejected")
    }

    fn try_connect_with_buffer(&self, buffer: usize) -> Option<TestClient> {
        let (client_io, server_io) = tokio::io::duplex(buffer);
        let port = self
            .next_port
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let addr = SocketAddr::from(([127, 0, 0, 1], port));

        let (conn, mut handler) =
            open_connection(&self.state, server_io, addr, self.shutdown_tx.subscribe())?;
        tokio::spawn(async move { handler.run().await });
        Some(TestClient::new(client_io, conn, self.state.wire.clone()))
    }

    /// Signals every read loop spawned by this context to stop.
    pub fn shutdown(&self) {
        self.state.begin_shutdown();
        let _ = self.shutdown_tx.send(());
    }

    /// Creates an account directly in the store and returns its id.
    pub async fn seed_user(&self, login: &str, password: &str, role: Role) -> i64 {
        let created = self
            .store
            .create_user(NewUser {
                login: login.to_string(),
                password_hash: hash_password(password),
                nickname: String::new(),
                avatar_id: String::new(),
                role_id: role.id(),
                fixed_key: String::new(),
            })
            .await;
        assert!(created, "failed to seed user {login}");
        self.store.find_by_login(login).await.unwrap().id
    }

    /// Seeds a user and returns a client already logged in as that user.
    pub async fn login_as(&self, login: &str, role: Role) -> (TestClient, i64) {
        self.login_as_with_buffer(login, role, 256 * 1024).await
    }

    /// Like `login_as`, over a pipe of `buffer` bytes.
    pub async fn login_as_with_buffer(
        &self,
        login: &str,
        role: Role,
        buffer: usize,
    ) -> (TestClient, i64) {
        let password = "Passw0rd";
        let id = self.seed_user(login, password, role).await;
        let mut client = self.connect_with_buffer(buffer);
        let reply = client.request("auth", [login, password]).await;
        assert_eq!(
            reply.args().to_vec(),
            vec!["allowed".to_string(), role.id().to_string(), id.to_string()]
        );
        (client, id)
    }
}

/// A client speaking the wire protocol over one end of a duplex pipe.
pub struct TestClient {
    pub conn: Arc<Connection>,
    framed: Framed<DuplexStream, ChunkFrameCodec>,
    wire: Arc<WireProtocol>,
}

impl TestClient {
    fn new(io: DuplexStream, conn: Arc<Connection>, wire: Arc<WireProtocol>) -> Self {
        let framed = Framed::new(io, wire.codec());
        Self { conn, framed, wire }
    }

    /// Sends a command without waiting for a reply.
    pub async fn send<I, S>(&mut self, command: &str, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_message(&Message::with_args(command, args)).await;
    }

    pub async fn send_message(&mut self, message: &Message) {
        let payload = self.wire.seal(message);
        self.framed.send(payload).await.expect("send failed");
    }

    /// Sends a raw, unencrypted frame payload.
    pub async fn send_raw(&mut self, payload: &str) {
        self.framed
            .send(payload.to_string())
            .await
            .expect("send failed");
    }

    /// Waits for the next message, or `None` on timeout or close.
    pub async fn recv(&mut self) -> Option<Message> {
        self.recv_within(REPLY_TIMEOUT).await
    }

    async fn recv_within(&mut self, window: Duration) -> Option<Message> {
        match tokio::time::timeout(window, self.framed.next()).await {
            Ok(Some(Ok(payload))) => Some(self.wire.open(&payload).expect("undecodable reply")),
            _ => None,
        }
    }

    /// Waits for the next message and asserts its command.
    pub async fn expect(&mut self, command: &str) -> Message {
        let message = self
            .recv()
            .await
            .unwrap_or_else(|| panic!("expected '{command}', got nothing"));
        assert_eq!(message.command(), command, "unexpected reply {message:?}");
        message
    }

    /// Sends a command and returns the next message.
    pub async fn request<I, S>(&mut self, command: &str, args: I) -> Message
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(command, args).await;
        self.recv()
            .await
            .unwrap_or_else(|| panic!("no reply to '{command}'"))
    }

    /// Keeps sending `command` without reading any reply, until the pipe
    /// backs up in both directions and the server is stuck writing to us.
    pub async fn flood_without_reading(&mut self, command: &str) {
        let flood = async {
            loop {
                let payload = self.wire.seal(&Message::new(command));
                if self.framed.send(payload).await.is_err() {
                    break;
                }
            }
        };
        let _ = tokio::time::timeout(SILENCE_WINDOW * 2, flood).await;
    }

    /// Asserts that nothing arrives within the silence window.
    pub async fn expect_silence(&mut self) {
        if let Some(message) = self.recv_within(SILENCE_WINDOW).await {
            panic!("expected silence, got {message:?}");
        }
    }

    /// Returns true once the server has closed its end of the pipe.
    pub async fn is_closed_by_server(&mut self) -> bool {
        loop {
            match tokio::time::timeout(REPLY_TIMEOUT, self.framed.next()).await {
                Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
                Err(_) => return false,
            }
        }
    }
}
