//! Flat on-disk artifact store.
//!
//! One directory (`books_dir`) holds both generated story text files and
//! generated image files, with no subdirectories or metadata records -
//! existence is implied solely by presence in the directory. A second
//! directory (`upload_dir`) holds transient voice recordings. Artifacts are
//! created once and never updated or deleted by the application.
//!
//! Story filenames are derived from the story's first line: the text before
//! the first `.`, truncated to 50 characters, with everything outside
//! alphanumerics/space/dash/underscore replaced by `_`, then spaces converted
//! to underscores. A numeric suffix is appended when the derived name is
//! already taken, so a new story never silently overwrites an old one.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::errors::{Error, Result};

/// How many source characters of the title feed the filename
const TITLE_TRUNCATION: usize = 50;

#[derive(Clone)]
pub struct ArtifactStore {
    upload_dir: PathBuf,
    books_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            books_dir: config.books_dir.clone(),
        }
    }

    /// Create the artifact directories if they do not exist
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.upload_dir).await?;
        fs::create_dir_all(&self.books_dir).await?;
        Ok(())
    }

    /// Persist a story, returning the filename it was written under.
    ///
    /// On a derived-name collision a `-1`, `-2`, ... suffix is probed until a
    /// free name is found.
    pub async fn save_story(&self, story: &str) -> Result<String> {
        let base = derive_story_title(story);

        let mut filename = format!("{base}.txt");
        let mut suffix = 1u32;
        while fs::try_exists(self.books_dir.join(&filename)).await? {
            filename = format!("{base}-{suffix}.txt");
            suffix += 1;
        }

        fs::write(self.books_dir.join(&filename), story).await?;
        debug!(filename = %filename, "Saved story artifact");
        Ok(filename)
    }

    /// Persist raw image bytes under a random name, returning the filename
    pub async fn save_image(&self, bytes: &[u8], extension: &str) -> Result<String> {
        let filename = format!("{}.{extension}", Uuid::new_v4());
        fs::write(self.books_dir.join(&filename), bytes).await?;
        debug!(filename = %filename, size = bytes.len(), "Saved image artifact");
        Ok(filename)
    }

    /// Persist an uploaded voice recording under a random name that keeps the
    /// original extension, returning the path it was written to
    pub async fn save_upload(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("wav");
        let path = self.upload_dir.join(format!("{}.{extension}", Uuid::new_v4()));
        fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Saved voice upload");
        Ok(path)
    }

    /// List saved story filenames (`.txt` only), sorted
    pub async fn list_stories(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.books_dir).await?;
        let mut stories = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.ends_with(".txt") {
                stories.push(name.to_string());
            }
        }
        stories.sort();
        Ok(stories)
    }

    /// Resolve an artifact filename to its path, rejecting path traversal
    pub fn book_path(&self, filename: &str) -> Result<PathBuf> {
        if filename.is_empty() || filename.contains(['/', '\\']) || filename.contains("..") {
            return Err(Error::BadRequest {
                message: "Invalid artifact filename".to_string(),
            });
        }
        Ok(self.books_dir.join(filename))
    }

    /// Read an artifact's contents, mapping a missing file to `NotFound`
    pub async fn read_book(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.book_path(filename)?;
        fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound {
                    resource: "Book".to_string(),
                    name: filename.to_string(),
                }
            } else {
                e.into()
            }
        })
    }
}

/// Derive the filesystem-safe title fragment for a story.
///
/// First line, text before the first `.`, truncated to 50 source characters;
/// disallowed characters become `_`, spaces become `_`, and stray `_`/spaces
/// at the ends are trimmed. Falls back to `story` for an empty result.
fn derive_story_title(story: &str) -> String {
    let title = story.trim().lines().next().unwrap_or("").trim();
    let title = title.split('.').next().unwrap_or("");
    let title: String = title.chars().take(TITLE_TRUNCATION).collect();

    let sanitized: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let name = sanitized.trim_matches([' ', '_']).replace(' ', "_");
    if name.is_empty() { "story".to_string() } else { name }
}
