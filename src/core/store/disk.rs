// src/core/store/disk.rs

//! A `FileStore` that serves images from a directory.
//!
//! Layout: `<dir>/<key>.png` or `<dir>/<key>.gif` for general images, and
//! `<dir>/avatars/<key>.<ext>` for images offered as avatars.

use super::FileStore;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTENSIONS: &[&str] = &["png", "gif"];
const AVATAR_SUBDIR: &str = "avatars";

#[derive(Debug, Clone)]
pub struct DiskImageStore {
    dir: PathBuf,
    default_avatar: Option<String>,
}

impl DiskImageStore {
    pub fn new(dir: impl Into<PathBuf>, default_avatar: Option<String>) -> Self {
        Self {
            dir: dir.into(),
            default_avatar,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rejects keys that could escape the image directory.
    fn is_safe_key(key: &str) -> bool {
        !key.is_empty() && !key.contains(['/', '\\']) && !key.contains("..")
    }

    fn candidates(&self, key: &str) -> impl Iterator<Item = PathBuf> + '_ {
        let avatars = self.dir.join(AVATAR_SUBDIR);
        let roots = [self.dir.clone(), avatars];
        let key = key.to_string();
        roots.into_iter().flat_map(move |root| {
            let key = key.clone();
            EXTENSIONS
                .iter()
                .map(move |ext| root.join(format!("{key}.{ext}")))
        })
    }
}

#[async_trait]
impl FileStore for DiskImageStore {
    async fn resolve(&self, key: &str) -> Option<String> {
        if !Self::is_safe_key(key) {
            warn!("Rejected image key '{}'.", key);
            return None;
        }
        for path in self.candidates(key) {
            match tokio::fs::read(&path).await {
                Ok(content) => return Some(BASE64.encode(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Failed to read image {}: {}", path.display(), e);
                    return None;
                }
            }
        }
        debug!("Image '{}' not found.", key);
        None
    }

    async fn avatar_keys(&self) -> Option<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(self.dir.join(AVATAR_SUBDIR)).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list avatars in {}: {}", self.dir.display(), e);
                return None;
            }
        };
        let mut keys = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| EXTENSIONS.contains(&e));
            if is_image && let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Some(keys)
    }

    async fn default_avatar_key(&self) -> Option<String> {
        self.default_avatar.clone()
    }
}
