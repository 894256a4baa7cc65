// tests/integration/dispatch_test.rs

//! Handler chain ordering, unknown commands and malformed frames.

use super::test_helpers::TestContext;
use async_trait::async_trait;
use scriptorium::config::Config;
use scriptorium::core::handler::{
    Dispatch, DispatchContext, HandlerKind, MessageHandler, dispatch,
};
use scriptorium::core::protocol::Message;
use scriptorium::core::store::Role;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Claims every message whose command is `ping` and replies `pong`.
#[derive(Debug, Default)]
struct PingHandler {
    seen: AtomicUsize,
    disposed: AtomicUsize,
}

#[async_trait]
impl MessageHandler for PingHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Anonymous
    }

    async fn try_handle(&self, ctx: &DispatchContext, message: &Message) -> bool {
        self.seen.fetch_add(1, Ordering::SeqCst);
        if !message.is("ping") {
            return false;
        }
        ctx.reply("pong", message.args().iter().cloned()).await;
        true
    }

    fn dispose(&self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_first_claiming_handler_wins() {
    let ctx = TestContext::new();
    let (mut client, _) = ctx.login_as("kate", Role::ReadOnly).await;
    let ping = Arc::new(PingHandler::default());
    assert!(client.conn.attach(ping.clone()));

    let reply = client.request("PING", ["1"]).await;
    assert_eq!(reply.command(), "pong");
    assert_eq!(reply.args(), ["1"]);

    // The authenticated session was attached first and claims its own commands.
    let reply = client.request("getserverinfo", Vec::<String>::new()).await;
    assert_eq!(reply.command(), "updateserverinfo");
    assert_eq!(ping.seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unclaimed_messages_fall_through_to_anonymous_set() {
    let ctx = TestContext::new();
    let mut client = ctx.connect();
    let ping = Arc::new(PingHandler::default());
    assert!(client.conn.attach(ping.clone()));

    let reply = client.request("reg", ["lena", "Secret1"]).await;
    assert_eq!(reply.command(), "reg_result");
    assert_eq!(ping.seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_one_handler_per_kind_and_dispose_on_detach() {
    let ctx = TestContext::new();
    let client = ctx.connect();
    let ping = Arc::new(PingHandler::default());

    assert!(client.conn.attach(ping.clone()));
    assert!(!client.conn.attach(Arc::new(PingHandler::default())));
    assert!(client.conn.has_handler(HandlerKind::Anonymous));

    assert!(client.conn.detach(HandlerKind::Anonymous));
    assert!(!client.conn.has_handler(HandlerKind::Anonymous));
    assert_eq!(ping.disposed.load(Ordering::SeqCst), 1);
    assert!(!client.conn.detach(HandlerKind::Anonymous));
}

#[tokio::test]
async fn test_unknown_command_is_counted_and_dropped() {
    let ctx = TestContext::new();
    let mut client = ctx.connect();

    client.send("frobnicate", ["x"]).await;
    client.expect_silence().await;
    assert_eq!(ctx.state.stats.get_unknown_commands(), 1);

    // The connection is still usable.
    let reply = client.request("auth", ["nobody", "Secret1"]).await;
    assert_eq!(reply.command(), "auth_result");
}

#[tokio::test]
async fn test_dispatch_reports_outcome() {
    let ctx = TestContext::new();
    let client = ctx.connect();
    let dctx = DispatchContext::new(ctx.state.clone(), client.conn.clone());

    let outcome = dispatch(&dctx, &Message::new("getnovellist").arg("0").arg("5")).await;
    assert_eq!(outcome, Dispatch::Unknown);

    let outcome = dispatch(&dctx, &Message::new("auth").arg("nobody").arg("Secret1")).await;
    assert_eq!(outcome, Dispatch::Claimed(HandlerKind::Anonymous));
    assert_eq!(ctx.state.stats.get_total_commands(), 2);
}

#[tokio::test]
async fn test_undecodable_frame_is_dropped() {
    let ctx = TestContext::new();
    let mut client = ctx.connect();

    client.send_raw("definitely not ciphertext").await;
    client.expect_silence().await;
    assert_eq!(ctx.state.stats.get_decode_failures(), 1);
    assert!(!client.conn.is_closed());

    let reply = client.request("reg", ["mike", "Secret1"]).await;
    assert_eq!(reply.args(), ["completed"]);
}

#[tokio::test]
async fn test_large_messages_cross_many_chunks() {
    let mut config = Config::default();
    config.protocol.chunk_size = 16;
    let ctx = TestContext::with_config(config);
    let (mut client, _) = ctx.login_as("nina", Role::Editor).await;

    let content = "word ".repeat(2_000);
    client
        .send("saveauthor", ["0", "Anonymous", content.as_str()])
        .await;
    let reply = client.expect("addauthor").await;
    let author: serde_json::Value = serde_json::from_str(reply.arg_at(0).unwrap()).unwrap();
    assert_eq!(author["Country"], content.trim());
}
