//! JSON file storage
//!
//! One file per key (`<data_dir>/<key>.json`). Writes go to a named
//! temporary file in the same directory which then replaces the document,
//! so a crash leaves either the old or the new document.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::{debug, info};

use super::{validate_key, KeyValueStore, StorageError, StorageResult};

/// Key-value store backed by a directory of JSON files
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Open a store in `data_dir`, creating the directory if necessary
    pub async fn open(data_dir: impl AsRef<Path>) -> StorageResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self::ensure_data_directory_exists(&data_dir).await?;
        info!("Using JSON file storage in {}", data_dir.display());
        Ok(Self { data_dir })
    }

    /// Directory holding the documents
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{key}.json"))
    }

    async fn ensure_data_directory_exists(path: &Path) -> StorageResult<()> {
        let data_dir_error = |reason: String| StorageError::DataDir {
            path: path.display().to_string(),
            reason,
        };

        if !path.exists() {
            info!("Creating data directory: {}", path.display());
            fs::create_dir_all(path)
                .await
                .map_err(|e| data_dir_error(e.to_string()))?;
        }

        // Verify we can write to the directory
        let probe = path.join(".armada_timer_write_test");
        fs::write(&probe, "test")
            .await
            .map_err(|e| data_dir_error(format!("not writable: {e}")))?;
        let _ = fs::remove_file(&probe).await;

        Ok(())
    }

    fn io_error(key: &str, source: std::io::Error) -> StorageError {
        StorageError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        validate_key(key)?;
        match fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        validate_key(key)?;
        let data_dir = self.data_dir.clone();
        let target = self.path_for(key);
        let contents = value.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || replace_file(&data_dir, &target, &contents))
            .await
            .map_err(|e| Self::io_error(key, std::io::Error::other(e)))?
            .map_err(|e| Self::io_error(key, e))?;
        debug!(key, bytes = value.len(), "stored document");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// Write `contents` to a temporary file in `dir`, then move it over `target`
fn replace_file(dir: &Path, target: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut staged = NamedTempFile::new_in(dir)?;
    staged.write_all(contents)?;
    staged.as_file().sync_all()?;
    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
}
