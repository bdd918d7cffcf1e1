//! Rolling on-disk store for uploaded images.

use crate::config::{check_extension, StorageConfig};
use crate::error::Result;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Metadata for one stored image.
#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub name: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Storage statistics for the status aggregate.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StorageStats {
    pub image_count: u64,
    pub total_size_bytes: u64,
    pub recent_images: Vec<StoredImage>,
}

/// Persists uploads under timestamped names and retains only the most
/// recent few.
pub struct ImageStore {
    dir: PathBuf,
    keep_last: usize,
    supported_formats: Vec<String>,
}

/// How many entries `StorageStats::recent_images` carries.
const RECENT_IMAGES: usize = 5;

impl ImageStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            dir: config.image_dir,
            keep_last: config.keep_last,
            supported_formats: config.supported_formats,
        }
    }

    /// Directory images are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `bytes` under a timestamped, sanitized name and prune old
    /// images. Returns the path of the saved file.
    ///
    /// An unsupported extension is rejected before anything touches the
    /// disk, so a bad upload never occupies a retention slot or shows
    /// up in the storage statistics.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        check_extension(Path::new(original_name), &self.supported_formats)?;

        let filename = format!(
            "{}_{}",
            Local::now().format("%Y%m%d_%H%M%S%3f"),
            sanitize_filename(original_name)
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "image saved");

        // Retention is best-effort; a failed prune never fails the save
        if let Err(err) = self.cleanup().await {
            warn!(error = %err, "image cleanup failed");
        }

        Ok(path)
    }

    /// Remove all but the `keep_last` most recently modified images.
    async fn cleanup(&self) -> Result<()> {
        let mut entries = self.list_by_modified().await?;
        for (path, _, _) in entries.drain(self.keep_last.min(entries.len())..) {
            debug!(path = %path.display(), "removing old image");
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    /// Count, total size, and the most recent files.
    pub async fn stats(&self) -> Result<StorageStats> {
        if !self.dir.exists() {
            return Ok(StorageStats::default());
        }

        let entries = self.list_by_modified().await?;
        let image_count = entries.len() as u64;
        let total_size_bytes = entries.iter().map(|(_, size, _)| size).sum();

        let recent_images = entries
            .into_iter()
            .take(RECENT_IMAGES)
            .map(|(path, size_bytes, modified)| StoredImage {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                size_bytes,
                modified: modified.map(DateTime::<Utc>::from),
            })
            .collect();

        Ok(StorageStats {
            image_count,
            total_size_bytes,
            recent_images,
        })
    }

    /// Regular files in the store, newest first.
    async fn list_by_modified(
        &self,
    ) -> Result<Vec<(PathBuf, u64, Option<std::time::SystemTime>)>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                files.push((entry.path(), metadata.len(), metadata.modified().ok()));
            }
        }
        files.sort_by(|a, b| b.2.cmp(&a.2));
        Ok(files)
    }
}

/// Strip path components and replace anything outside a conservative
/// character set, so uploads cannot escape the image directory.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches(|c| c == '.' || c == '_').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
