// Upload store: writes uploaded file bytes to disk and produces session file metadata

use crate::models::UploadConfig;
use crate::session::FileMeta;
use chrono::Utc;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const MAX_NAME_ATTEMPTS: usize = 16;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file provided")]
    MissingFile,

    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid upload: {0}")]
    Invalid(String),

    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory-backed file store
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    public_path: String,
    max_file_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, public_path: &str, max_file_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            public_path: public_path.trim_end_matches('/').to_string(),
            max_file_bytes,
        }
    }

    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.dir, &config.public_path, config.max_file_bytes)
    }

    /// Create the upload directory if needed
    pub async fn init(&self) -> Result<(), UploadError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        info!("Upload directory: {}", self.dir.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_path(&self) -> &str {
        &self.public_path
    }

    /// Write `bytes` under a unique name and describe the result
    pub async fn save(
        &self,
        original_name: &str,
        media_type: &str,
        bytes: &[u8],
    ) -> Result<FileMeta, UploadError> {
        if bytes.len() > self.max_file_bytes {
            return Err(UploadError::TooLarge {
                size: bytes.len(),
                max: self.max_file_bytes,
            });
        }

        let name = sanitize_file_name(original_name);
        let millis = Utc::now().timestamp_millis();
        let (stored_name, mut file) = self.create_unique(millis, &name).await?;

        file.write_all(bytes).await?;
        file.flush().await?;

        debug!("Stored upload {} ({} bytes)", stored_name, bytes.len());

        Ok(FileMeta {
            name: original_name.to_string(),
            url: format!("{}/{}", self.public_path, stored_name),
            stored_name,
            media_type: if media_type.is_empty() {
                "application/octet-stream".to_string()
            } else {
                media_type.to_string()
            },
            size: bytes.len() as u64,
        })
    }

    /// Open a new file named `<millis>-<name>`, adding a counter when two
    /// uploads of the same name land in the same millisecond
    async fn create_unique(
        &self,
        millis: i64,
        name: &str,
    ) -> Result<(String, tokio::fs::File), UploadError> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stored_name = if attempt == 0 {
                format!("{}-{}", millis, name)
            } else {
                format!("{}-{}-{}", millis, attempt, name)
            };

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.dir.join(&stored_name))
                .await
            {
                Ok(file) => return Ok((stored_name, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(UploadError::Invalid(format!(
            "could not find a free name for {}",
            name
        )))
    }

    /// Delete a stored file; missing files are ignored
    pub async fn remove(&self, stored_name: &str) {
        // Stored names never contain separators; refuse anything that does
        if stored_name != sanitize_file_name(stored_name) {
            warn!("Refusing to remove suspicious upload name {:?}", stored_name);
            return;
        }

        match tokio::fs::remove_file(self.dir.join(stored_name)).await {
            Ok(()) => debug!("Removed upload {}", stored_name),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove upload {}: {}", stored_name, e),
        }
    }
}

/// Reduce a client-supplied name to a safe final path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my file.txt"), "my_file.txt");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("résumé.doc"), "r_sum_.doc");
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path(), "/uploads/", 1024);
        store.init().await.unwrap();

        let meta = store.save("notes.txt", "text/plain", b"hello").await.unwrap();
        assert_eq!(meta.name, "notes.txt");
        assert!(meta.stored_name.ends_with("-notes.txt"));
        assert_eq!(meta.url, format!("/uploads/{}", meta.stored_name));
        assert_eq!(meta.media_type, "text/plain");
        assert_eq!(meta.size, 5);

        let path = temp.path().join(&meta.stored_name);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        store.remove(&meta.stored_name).await;
        assert!(!path.exists());

        // Removing twice is harmless
        store.remove(&meta.stored_name).await;
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_file() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path(), "/uploads", 4);

        let err = store.save("big.bin", "", b"12345").await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { size: 5, max: 4 }));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_clobber() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path(), "/uploads", 16);

        let a = store.create_unique(1, "a.txt").await.unwrap().0;
        let b = store.create_unique(1, "a.txt").await.unwrap().0;
        assert_eq!(a, "1-a.txt");
        assert_eq!(b, "1-1-a.txt");
    }

    #[tokio::test]
    async fn test_default_media_type() {
        let temp = TempDir::new().unwrap();
        let store = UploadStore::new(temp.path(), "/uploads", 16);

        let meta = store.save("blob", "", b"x").await.unwrap();
        assert_eq!(meta.media_type, "application/octet-stream");
    }
}
