// tests/integration/server_test.rs

//! The accept loop over real TCP sockets, client limits and shutdown.

use super::test_helpers::TestContext;
use futures::{SinkExt, StreamExt};
use scriptorium::config::Config;
use scriptorium::core::protocol::Message;
use scriptorium::core::state::ServerState;
use scriptorium::core::store::MemoryStore;
use scriptorium::server::{run_until, setup_with_state};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio_util::codec::Framed;

fn local_config() -> Config {
    let mut config = Config::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.shutdown_grace = Duration::from_secs(1);
    config.accounts.owner_login = Some("root".to_string());
    config.accounts.owner_password = Some("Toor123".to_string());
    config
}

#[tokio::test]
async fn test_tcp_session_and_graceful_shutdown() {
    let store = Arc::new(MemoryStore::new());
    let state =
        ServerState::with_stores(local_config(), store.clone(), store.clone(), store).unwrap();
    let server = setup_with_state(state.clone()).await.unwrap();
    let addr = server.local_addr().unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server_task = tokio::spawn(run_until(server, async move {
        let _ = stop_rx.await;
    }));

    let socket = TcpStream::connect(addr).await.unwrap();
    let mut framed = Framed::new(socket, state.wire.codec());
    framed
        .send(state.wire.seal(&Message::new("auth").arg("root").arg("Toor123")))
        .await
        .unwrap();
    let payload = tokio::time::timeout(Duration::from_secs(2), framed.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let reply = state.wire.open(&payload).unwrap();
    assert_eq!(reply.command(), "auth_result");
    assert_eq!(reply.arg_at(0), Some("allowed"));
    assert_eq!(reply.arg_at(1), Some("1"));
    assert_eq!(state.registry.count(), 1);

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server_task)
        .await
        .expect("server did not shut down")
        .unwrap();

    assert!(state.is_shutting_down());
    assert!(state.registry.is_empty());
    let closed = tokio::time::timeout(Duration::from_secs(2), framed.next())
        .await
        .unwrap();
    assert!(matches!(closed, None | Some(Err(_))));
}

#[tokio::test]
async fn test_connections_beyond_limit_are_refused() {
    let mut config = Config::default();
    config.max_clients = 2;
    let ctx = TestContext::with_config(config);

    let _first = ctx.connect();
    let _second = ctx.connect();
    assert!(ctx.try_connect().is_none());
    assert_eq!(ctx.state.registry.count(), 2);
    assert_eq!(ctx.state.stats.get_total_connections(), 3);
}

#[tokio::test]
async fn test_shutdown_signal_stops_read_loops() {
    let ctx = TestContext::new();
    let mut client = ctx.connect();

    ctx.shutdown();
    assert!(client.is_closed_by_server().await);
    assert!(ctx.state.registry.is_empty());
    assert!(ctx.try_connect().is_none());
}

#[tokio::test]
async fn test_disconnect_all_finishes_with_a_stalled_client() {
    let ctx = TestContext::new();
    let (mut stalled, _) = ctx
        .login_as_with_buffer("xena", scriptorium::core::store::Role::Editor, 512)
        .await;
    stalled.flood_without_reading("getserverinfo").await;
    let mut idle = ctx.connect();

    let closed = tokio::time::timeout(
        Duration::from_secs(3),
        ctx.state.registry.disconnect_all(Duration::from_secs(2)),
    )
    .await;
    assert_eq!(closed.ok(), Some(2));
    assert!(ctx.state.registry.is_empty());
    assert!(stalled.conn.is_closed());
    assert!(idle.is_closed_by_server().await);
}
