// src/core/store/mod.rs

//! Interfaces to the external collaborators that own persistent records and
//! file content, plus reference implementations.
//!
//! Every call reports failure as `false` or `None` rather than an error: the
//! session layer only ever needs to know whether the store did what it asked.

pub mod disk;
pub mod memory;
pub mod model;

pub use disk::DiskImageStore;
pub use memory::MemoryStore;
pub use model::{
    Author, Chapter, ChatMessage, FileData, MessageKind, NewUser, Novel, Role, User, UserView,
};

use async_trait::async_trait;
use std::fmt::Debug;
use std::ops::Range;

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    async fn is_login_taken(&self, login: &str) -> bool;
    /// Returns `false` if the record could not be persisted.
    async fn create_user(&self, user: NewUser) -> bool;
    async fn find_by_login(&self, login: &str) -> Option<User>;
    async fn find_by_id(&self, id: i64) -> Option<User>;
    /// Overwrites the stored record with the same id. `false` if it does not exist.
    async fn update(&self, user: &User) -> bool;
    /// Users ordered by id, sliced by position.
    async fn list_users(&self, range: Range<usize>) -> Option<Vec<User>>;
}

/// Authors, novels and chapter messages.
#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    async fn list_authors(&self, range: Range<usize>) -> Option<Vec<Author>>;
    /// Inserts when `author.id == 0`, otherwise updates. Returns the stored record.
    async fn save_author(&self, author: Author) -> Option<Author>;
    async fn remove_author(&self, id: i64) -> bool;

    async fn list_novels(&self, range: Range<usize>) -> Option<Vec<Novel>>;
    /// Inserts when `novel.id == 0`, otherwise updates. Chapters are matched by
    /// title: existing titles keep their ids, missing ones are dropped. An
    /// update keeps the original creation date.
    async fn save_novel(&self, novel: Novel) -> Option<Novel>;
    async fn remove_novel(&self, id: i64) -> bool;

    async fn list_messages(&self, chapter_id: i64, range: Range<usize>)
    -> Option<Vec<ChatMessage>>;
    async fn save_message(&self, message: ChatMessage) -> Option<ChatMessage>;
}

/// Content-addressed file storage (images).
#[async_trait]
pub trait FileStore: Send + Sync + Debug {
    /// The file content, base64-encoded, if the key is known.
    async fn resolve(&self, key: &str) -> Option<String>;
    /// Keys of images offered as avatars.
    async fn avatar_keys(&self) -> Option<Vec<String>>;
    /// Key assigned to newly registered accounts.
    async fn default_avatar_key(&self) -> Option<String>;
}

/// Clamps a requested range to `len` so slicing never panics.
pub(crate) fn clamp_range(range: Range<usize>, len: usize) -> Range<usize> {
    let start = range.start.min(len);
    let end = range.end.clamp(start, len);
    start..end
}
