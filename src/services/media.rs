//! Media Storage Collaborator
//!
//! Stores uploaded binaries under a base directory keyed by a logical folder
//! (course_thumbnails, lesson_videos, lesson_images) and returns a stable URI.
//! Deletion is addressed by URI; callers that replace or remove media treat
//! deletion as best-effort and must not fail their primary operation on it.

use std::path::PathBuf;

use crate::config::Config;

#[derive(Debug)]
pub enum MediaError {
    InvalidUrl(String),
    Io(std::io::Error),
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaError::InvalidUrl(url) => write!(f, "Cannot derive object key from '{}'", url),
            MediaError::Io(err) => write!(f, "Media storage IO error: {}", err),
        }
    }
}

impl std::error::Error for MediaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MediaError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Io(err)
    }
}

/// Derive the storage key (folder/file) from a media URI. The key is the last
/// two path segments, with any query string stripped; everything before them
/// (scheme, host, version prefixes) is delivery detail.
pub fn object_key(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut segments = path.split('/').rev().filter(|s| !s.is_empty());
    let file = segments.next()?;
    let folder = segments.next()?;
    if file.is_empty() || folder.is_empty() {
        return None;
    }
    Some(format!("{}/{}", folder, file))
}

#[derive(Clone)]
pub struct MediaStore {
    base_path: PathBuf,
}

impl MediaStore {
    pub fn new(config: &Config) -> Self {
        Self {
            base_path: PathBuf::from(&config.media_base_path),
        }
    }

    /// Store a binary under `folder/file_name` and return its URI.
    pub async fn store(
        &self,
        folder: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, MediaError> {
        let dir = self.base_path.join(folder);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(file_name), bytes).await?;

        Ok(format!("/media/{}/{}", folder, file_name))
    }

    pub async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let key = object_key(url).ok_or_else(|| MediaError::InvalidUrl(url.to_string()))?;
        tokio::fs::remove_file(self.base_path.join(key)).await?;
        Ok(())
    }

    /// Release a stored object without letting failure propagate. Used when
    /// media is replaced or its owning lesson/course goes away.
    pub async fn delete_best_effort(&self, url: Option<&str>) {
        let Some(url) = url else { return };
        match self.delete(url).await {
            Ok(()) => tracing::debug!(url, "Released stored media object"),
            Err(e) => tracing::warn!(url, error = %e, "Failed to release media object"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_from_cdn_url() {
        assert_eq!(
            object_key("https://cdn.example.com/v1712/lesson_videos/intro.mp4").as_deref(),
            Some("lesson_videos/intro.mp4")
        );
    }

    #[test]
    fn test_object_key_strips_query_string() {
        assert_eq!(
            object_key("/media/course_thumbnails/rust.png?token=abc").as_deref(),
            Some("course_thumbnails/rust.png")
        );
    }

    #[test]
    fn test_object_key_needs_folder_and_file() {
        assert!(object_key("intro.mp4").is_none());
        assert!(object_key("").is_none());
    }

    #[tokio::test]
    async fn test_store_then_delete_round_trip() {
        let base = std::env::temp_dir().join(format!("learnhub-media-{}", uuid::Uuid::now_v7()));
        let store = MediaStore {
            base_path: base.clone(),
        };

        let url = store
            .store("lesson_images", "diagram.png", b"png-bytes")
            .await
            .unwrap();
        assert_eq!(url, "/media/lesson_images/diagram.png");
        assert!(base.join("lesson_images/diagram.png").exists());

        store.delete(&url).await.unwrap();
        assert!(!base.join("lesson_images/diagram.png").exists());

        // Second delete fails, but best-effort swallows it.
        assert!(store.delete(&url).await.is_err());
        store.delete_best_effort(Some(&url)).await;
    }
}
