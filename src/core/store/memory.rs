// src/core/store/memory.rs

//! An in-process store implementing all three collaborator interfaces.
//!
//! Used by tests and by servers started without an external database. Records
//! live in ordered maps keyed by id, so listings come out in insertion order.

use super::model::{
    AVATAR_DESCRIPTION, Author, ChatMessage, DEFAULT_AVATAR_DESCRIPTION, FileData, NewUser, Novel,
    User,
};
use super::{ContentStore, FileStore, UserStore, clamp_range};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Hands out positive ids, starting at 1.
#[derive(Debug)]
struct IdSequence(AtomicI64);

impl Default for IdSequence {
    fn default() -> Self {
        Self(AtomicI64::new(1))
    }
}

impl IdSequence {
    fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<BTreeMap<i64, User>>,
    authors: RwLock<BTreeMap<i64, Author>>,
    novels: RwLock<BTreeMap<i64, Novel>>,
    messages: RwLock<BTreeMap<i64, ChatMessage>>,
    files: RwLock<BTreeMap<String, (FileData, Vec<u8>)>>,
    user_ids: IdSequence,
    author_ids: IdSequence,
    novel_ids: IdSequence,
    chapter_ids: IdSequence,
    message_ids: IdSequence,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file to the catalog, replacing any entry with the same key.
    pub fn insert_file(&self, key: &str, description: &str, content: Vec<u8>) {
        let data = FileData {
            key: key.to_string(),
            description: description.to_string(),
        };
        self.files.write().insert(key.to_string(), (data, content));
    }

    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    fn keys_with_description(&self, description: &str) -> Vec<String> {
        self.files
            .read()
            .values()
            .filter(|(data, _)| data.description == description)
            .map(|(data, _)| data.key.clone())
            .collect()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn is_login_taken(&self, login: &str) -> bool {
        self.users.read().values().any(|u| u.login == login)
    }

    async fn create_user(&self, user: NewUser) -> bool {
        let mut users = self.users.write();
        // Checked again under the write lock: two registrations may race past
        // `is_login_taken`.
        if users.values().any(|u| u.login == user.login) {
            return false;
        }
        let id = self.user_ids.next();
        users.insert(
            id,
            User {
                id,
                login: user.login,
                password_hash: user.password_hash,
                nickname: user.nickname,
                avatar_id: user.avatar_id,
                role_id: user.role_id,
                fixed_key: user.fixed_key,
            },
        );
        debug!("User {} created.", id);
        true
    }

    async fn find_by_login(&self, login: &str) -> Option<User> {
        self.users.read().values().find(|u| u.login == login).cloned()
    }

    async fn find_by_id(&self, id: i64) -> Option<User> {
        self.users.read().get(&id).cloned()
    }

    async fn update(&self, user: &User) -> bool {
        match self.users.write().get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                true
            }
            None => false,
        }
    }

    async fn list_users(&self, range: Range<usize>) -> Option<Vec<User>> {
        let users = self.users.read();
        let range = clamp_range(range, users.len());
        Some(
            users
                .values()
                .skip(range.start)
                .take(range.len())
                .cloned()
                .collect(),
        )
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_authors(&self, range: Range<usize>) -> Option<Vec<Author>> {
        let authors = self.authors.read();
        let range = clamp_range(range, authors.len());
        Some(
            authors
                .values()
                .skip(range.start)
                .take(range.len())
                .cloned()
                .collect(),
        )
    }

    async fn save_author(&self, mut author: Author) -> Option<Author> {
        let mut authors = self.authors.write();
        if author.id == 0 {
            author.id = self.author_ids.next();
        } else if !authors.contains_key(&author.id) {
            return None;
        }
        authors.insert(author.id, author.clone());
        Some(author)
    }

    async fn remove_author(&self, id: i64) -> bool {
        if self.authors.write().remove(&id).is_none() {
            return false;
        }
        // Novels of a removed author go with it, along with their messages.
        let removed_chapters: Vec<i64> = {
            let mut novels = self.novels.write();
            let doomed: Vec<i64> = novels
                .values()
                .filter(|n| n.author_id == id)
                .map(|n| n.id)
                .collect();
            doomed
                .iter()
                .filter_map(|novel_id| novels.remove(novel_id))
                .flat_map(|n| n.chapters.into_iter().map(|c| c.id))
                .collect()
        };
        self.messages
            .write()
            .retain(|_, m| !removed_chapters.contains(&m.chapter_id));
        true
    }

    async fn list_novels(&self, range: Range<usize>) -> Option<Vec<Novel>> {
        let novels = self.novels.read();
        let range = clamp_range(range, novels.len());
        Some(
            novels
                .values()
                .skip(range.start)
                .take(range.len())
                .cloned()
                .collect(),
        )
    }

    async fn save_novel(&self, mut novel: Novel) -> Option<Novel> {
        if !self.authors.read().contains_key(&novel.author_id) {
            return None;
        }
        let mut novels = self.novels.write();
        let previous = if novel.id == 0 {
            novel.id = self.novel_ids.next();
            Vec::new()
        } else {
            let existing = novels.get(&novel.id)?;
            novel.creation_date = existing.creation_date;
            existing.chapters.clone()
        };

        for chapter in &mut novel.chapters {
            chapter.id = previous
                .iter()
                .find(|c| c.title == chapter.title)
                .map_or_else(|| self.chapter_ids.next(), |c| c.id);
        }
        novel.chapter_count = novel.chapters.len();

        let kept: Vec<i64> = novel.chapters.iter().map(|c| c.id).collect();
        let dropped: Vec<i64> = previous
            .iter()
            .map(|c| c.id)
            .filter(|id| !kept.contains(id))
            .collect();
        novels.insert(novel.id, novel.clone());
        drop(novels);

        if !dropped.is_empty() {
            self.messages
                .write()
                .retain(|_, m| !dropped.contains(&m.chapter_id));
        }
        Some(novel)
    }

    async fn remove_novel(&self, id: i64) -> bool {
        let Some(novel) = self.novels.write().remove(&id) else {
            return false;
        };
        let chapters: Vec<i64> = novel.chapters.iter().map(|c| c.id).collect();
        self.messages
            .write()
            .retain(|_, m| !chapters.contains(&m.chapter_id));
        true
    }

    async fn list_messages(
        &self,
        chapter_id: i64,
        range: Range<usize>,
    ) -> Option<Vec<ChatMessage>> {
        let messages = self.messages.read();
        let in_chapter: Vec<&ChatMessage> = messages
            .values()
            .filter(|m| m.chapter_id == chapter_id)
            .collect();
        let range = clamp_range(range, in_chapter.len());
        Some(in_chapter[range].iter().map(|m| (*m).clone()).collect())
    }

    async fn save_message(&self, mut message: ChatMessage) -> Option<ChatMessage> {
        let chapter_exists = self
            .novels
            .read()
            .values()
            .any(|n| n.chapters.iter().any(|c| c.id == message.chapter_id));
        if !chapter_exists {
            return None;
        }
        message.id = self.message_ids.next();
        self.messages.write().insert(message.id, message.clone());
        Some(message)
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn resolve(&self, key: &str) -> Option<String> {
        self.files
            .read()
            .get(key)
            .map(|(_, content)| BASE64.encode(content))
    }

    async fn avatar_keys(&self) -> Option<Vec<String>> {
        Some(self.keys_with_description(AVATAR_DESCRIPTION))
    }

    async fn default_avatar_key(&self) -> Option<String> {
        self.keys_with_description(DEFAULT_AVATAR_DESCRIPTION)
            .into_iter()
            .next()
    }
}
