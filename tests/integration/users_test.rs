// tests/integration/users_test.rs

//! Profile commands and staff user administration.

use super::test_helpers::TestContext;
use scriptorium::core::store::{Role, UserStore};

#[tokio::test]
async fn test_get_user_info_falls_back_to_login() {
    let ctx = TestContext::new();
    let (mut client, _) = ctx.login_as("olga", Role::Editor).await;

    let reply = client.request("getuserinfo", Vec::<String>::new()).await;
    assert_eq!(reply.command(), "setuserinfo");
    assert_eq!(reply.args().to_vec(), vec!["", "Editor"]);
}

#[tokio::test]
async fn test_get_server_info_counts_connections() {
    let ctx = TestContext::new();
    let (mut client, _) = ctx.login_as("pavel", Role::ReadOnly).await;
    let _other = ctx.connect();

    let reply = client.request("getserverinfo", Vec::<String>::new()).await;
    assert_eq!(reply.command(), "updateserverinfo");
    assert_eq!(reply.args(), ["2"]);
}

#[tokio::test]
async fn test_update_avatar_and_edit_profile_info() {
    let ctx = TestContext::new();
    ctx.store.insert_file("cat", "Avatar Image File", b"meow".to_vec());
    ctx.store.insert_file("dog", "Avatar Image File", b"woof".to_vec());
    let (mut client, id) = ctx.login_as("quinn", Role::ReadOnly).await;

    let reply = client.request("geteditprofileinfo", Vec::<String>::new()).await;
    assert_eq!(reply.command(), "setuseravatarimages");
    assert_eq!(reply.args().to_vec(), vec!["cat", "dog"]);
    let reply = client.expect("seteditprofiledata").await;
    assert_eq!(reply.args().to_vec(), vec!["", "Read-only user", ""]);

    client.send("updateuseravatar", ["dog"]).await;
    let reply = client.expect("loadimages").await;
    assert_eq!(reply.args(), ["dog:key:d29vZg=="]);
    client.expect("setuserinfo").await;
    let reply = client.expect("seteditprofiledata").await;
    assert_eq!(reply.arg_at(2), Some("dog"));

    let user = ctx.store.find_by_id(id).await.unwrap();
    assert_eq!(user.avatar_id, "dog");
}

#[tokio::test]
async fn test_staff_only_commands_are_ignored_for_editors() {
    let ctx = TestContext::new();
    let (mut client, _) = ctx.login_as("rosa", Role::Editor).await;

    client.send("getusers", ["0", "10"]).await;
    client.expect_silence().await;
    client.send("removeauthor", ["1"]).await;
    client.expect_silence().await;
}

#[tokio::test]
async fn test_get_users_lists_projection() {
    let ctx = TestContext::new();
    let (mut admin, _) = ctx.login_as("sam", Role::Administrator).await;
    ctx.seed_user("tina", "Secret1", Role::ReadOnly).await;

    let reply = admin.request("getusers", ["0", "10"]).await;
    assert_eq!(reply.command(), "setusers");
    let users: serde_json::Value = serde_json::from_str(reply.arg_at(0).unwrap()).unwrap();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[1]["Login"], "tina");
    assert_eq!(users[1]["RoleName"], "Read-only user");
    assert!(users[1].get("PasswordHash").is_none());

    let reply = admin.request("getusers", ["1", "2"]).await;
    let users: serde_json::Value = serde_json::from_str(reply.arg_at(0).unwrap()).unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);

    admin.send("getusers", ["5", "2"]).await;
    admin.expect_silence().await;
}

#[tokio::test]
async fn test_edit_user_disconnects_target_and_notifies_staff() {
    let ctx = TestContext::new();
    let (mut admin, _) = ctx.login_as("uma", Role::Administrator).await;
    let (mut target, target_id) = ctx.login_as("victor", Role::ReadOnly).await;
    let (mut reader, _) = ctx.login_as("wendy", Role::ReadOnly).await;

    admin
        .send("edituser", [target_id.to_string(), "3".to_string(), "Vic".to_string()])
        .await;
    let reply = admin.expect("edituser_result").await;
    assert_eq!(reply.args(), ["completed"]);
    let reply = admin.expect("updateuser").await;
    let view: serde_json::Value = serde_json::from_str(reply.arg_at(0).unwrap()).unwrap();
    assert_eq!(view["Nickname"], "Vic");
    assert_eq!(view["RoleName"], "Editor");

    assert!(target.is_closed_by_server().await);
    assert!(target.conn.is_closed());
    assert!(ctx.state.registry.find_by_principal_id(target_id).is_none());
    reader.expect_silence().await;

    let user = ctx.store.find_by_id(target_id).await.unwrap();
    assert_eq!(user.role_id, Role::Editor.id());
}

#[tokio::test]
async fn test_edit_user_privilege_rules() {
    let ctx = TestContext::new();
    let (mut admin, admin_id) = ctx.login_as("xena", Role::Administrator).await;
    let owner_id = ctx.seed_user("yuri", "Secret1", Role::Owner).await;
    let plain_id = ctx.seed_user("zoe", "Secret1", Role::ReadOnly).await;

    // Administrators cannot touch owners or create them.
    admin
        .send("edituser", [owner_id.to_string(), "4".into(), "x".into()])
        .await;
    admin.expect_silence().await;
    admin
        .send("edituser", [plain_id.to_string(), "1".into(), "x".into()])
        .await;
    admin.expect_silence().await;
    // Nobody changes their own role.
    admin
        .send("edituser", [admin_id.to_string(), "4".into(), "x".into()])
        .await;
    admin.expect_silence().await;
    // Unknown role ids are ignored.
    admin
        .send("edituser", [plain_id.to_string(), "9".into(), "x".into()])
        .await;
    admin.expect_silence().await;

    // Editing one's own nickname keeps the session and refreshes the principal.
    admin
        .send("edituser", [admin_id.to_string(), "2".into(), "Boss".into()])
        .await;
    admin.expect("edituser_result").await;
    admin.expect("updateuser").await;
    assert!(!admin.conn.is_closed());
    assert_eq!(admin.conn.principal().unwrap().display_name, "Boss");
}
