// tests/integration/content_test.rs

//! Authors, novels and chapter messages, and their broadcasts.

use super::test_helpers::TestContext;
use scriptorium::core::store::Role;
use serde_json::Value;

fn json(arg: Option<&str>) -> Value {
    serde_json::from_str(arg.expect("missing json argument")).expect("invalid json")
}

#[tokio::test]
async fn test_save_author_broadcasts_to_authenticated_only() {
    let ctx = TestContext::new();
    let (mut editor, _) = ctx.login_as("amos", Role::Editor).await;
    let (mut reader, _) = ctx.login_as("bella", Role::ReadOnly).await;
    let mut anonymous = ctx.connect();

    editor.send("saveauthor", ["0", "Leo Tolstoy", "Russia"]).await;
    let added = json(editor.expect("addauthor").await.arg_at(0));
    assert_eq!(added["Name"], "Leo Tolstoy");
    let id = added["Id"].as_i64().unwrap();
    assert!(id > 0);
    assert_eq!(json(reader.expect("addauthor").await.arg_at(0)), added);
    anonymous.expect_silence().await;

    editor
        .send("saveauthor", [id.to_string(), "Lev Tolstoy".into(), "Russia".into()])
        .await;
    let updated = json(editor.expect("updateauthor").await.arg_at(0));
    assert_eq!(updated["Id"], id);
    assert_eq!(updated["Name"], "Lev Tolstoy");

    assert_eq!(json(reader.expect("updateauthor").await.arg_at(0)), updated);

    let list = json(reader.request("getauthorlist", ["0", "10"]).await.arg_at(0));
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_read_only_users_cannot_write() {
    let ctx = TestContext::new();
    let (mut reader, _) = ctx.login_as("carl", Role::ReadOnly).await;

    reader.send("saveauthor", ["0", "Someone", "Nowhere"]).await;
    reader.expect_silence().await;
    reader.send("savemessage", ["1", "1", "hello"]).await;
    reader.expect_silence().await;
}

#[tokio::test]
async fn test_novel_lifecycle() {
    let ctx = TestContext::new();
    let (mut owner, _) = ctx.login_as("dora", Role::Owner).await;

    owner.send("saveauthor", ["0", "Anna Akhmatova", "Russia"]).await;
    let author = json(owner.expect("addauthor").await.arg_at(0));
    let author_id = author["Id"].as_i64().unwrap().to_string();

    let chapters = r#"[{"Title":"One"},{"Title":"Two"}]"#;
    owner
        .send("savenovel", ["0", "Requiem", author_id.as_str(), chapters])
        .await;
    let novel = json(owner.expect("addnovel").await.arg_at(0));
    assert_eq!(novel["Title"], "Requiem");
    assert_eq!(novel["ChapterCount"], 2);
    let novel_id = novel["Id"].as_i64().unwrap().to_string();
    let first_chapter = novel["Chapters"][0]["Id"].clone();

    // Renaming keeps matching chapters and drops the rest.
    let chapters = r#"[{"Title":"One"},{"Title":"Three"}]"#;
    owner
        .send("savenovel", [novel_id.as_str(), "Requiem", author_id.as_str(), chapters])
        .await;
    let updated = json(owner.expect("updatenovel").await.arg_at(0));
    assert_eq!(updated["Chapters"][0]["Id"], first_chapter);
    assert_eq!(updated["Chapters"][1]["Title"], "Three");
    assert_eq!(updated["CreationDate"], novel["CreationDate"]);

    let list = json(owner.request("getnovellist", ["0", "10"]).await.arg_at(0));
    assert_eq!(list.as_array().unwrap().len(), 1);

    let reply = owner.request("removenovel", [novel_id.as_str()]).await;
    assert_eq!(reply.command(), "removenovel");
    assert_eq!(reply.args(), [novel_id.as_str()]);

    let list = json(owner.request("getnovellist", ["0", "10"]).await.arg_at(0));
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_save_novel_with_unknown_author_is_silent() {
    let ctx = TestContext::new();
    let (mut editor, _) = ctx.login_as("emil", Role::Editor).await;

    editor.send("savenovel", ["0", "Orphan", "42", "[]"]).await;
    editor.expect_silence().await;
    editor.send("savenovel", ["0", "Broken", "1", "not json"]).await;
    editor.expect_silence().await;
}

#[tokio::test]
async fn test_messages_are_signed_by_sender() {
    let ctx = TestContext::new();
    let (mut editor, _) = ctx.login_as("fiona", Role::Editor).await;
    let (mut reader, _) = ctx.login_as("gus", Role::ReadOnly).await;

    editor.send("saveauthor", ["0", "Nikolai Gogol", "Ukraine"]).await;
    let author = json(editor.expect("addauthor").await.arg_at(0));
    reader.expect("addauthor").await;
    editor
        .send(
            "savenovel",
            [
                "0".to_string(),
                "Dead Souls".to_string(),
                author["Id"].to_string(),
                r#"[{"Title":"Chapter 1"}]"#.to_string(),
            ],
        )
        .await;
    let novel = json(editor.expect("addnovel").await.arg_at(0));
    reader.expect("addnovel").await;
    let chapter_id = novel["Chapters"][0]["Id"].to_string();

    editor
        .send("savemessage", [chapter_id.as_str(), "1", "Chichikov arrives"])
        .await;
    let message = json(editor.expect("addmessage").await.arg_at(0));
    assert_eq!(message["SenderName"], "fiona");
    assert_eq!(message["Content"], "Chichikov arrives");
    reader.expect("addmessage").await;

    // Unknown message types are ignored.
    editor.send("savemessage", [chapter_id.as_str(), "7", "?"]).await;
    editor.expect_silence().await;

    let reply = reader
        .request("getmessages", [chapter_id.as_str(), "0", "50"])
        .await;
    assert_eq!(reply.command(), "setmessages");
    assert_eq!(reply.arg_at(0), Some(chapter_id.as_str()));
    let messages = json(reply.arg_at(1));
    assert_eq!(messages.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_remove_author_requires_staff() {
    let ctx = TestContext::new();
    let (mut admin, _) = ctx.login_as("hana", Role::Administrator).await;
    let (mut editor, _) = ctx.login_as("igor", Role::Editor).await;

    admin.send("saveauthor", ["0", "Anton Chekhov", "Russia"]).await;
    let author = json(admin.expect("addauthor").await.arg_at(0));
    editor.expect("addauthor").await;
    let id = author["Id"].to_string();

    editor.send("removeauthor", [id.as_str()]).await;
    editor.expect_silence().await;

    admin.send("removeauthor", [id.as_str()]).await;
    assert_eq!(admin.expect("removeauthor").await.args(), [id.as_str()]);
    assert_eq!(editor.expect("removeauthor").await.args(), [id.as_str()]);
}
