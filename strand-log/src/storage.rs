//! Storage abstraction for log segments.
//!
//! The storage trait handles raw bytes at offsets. Segments, entries and
//! checksums are the log's concern.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{LogError, LogResult};

/// Storage backend for segment files.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Opens or creates a file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or created.
    async fn open(&self, path: &Path) -> LogResult<Box<dyn StorageFile>>;

    /// Lists files in a directory with the given extension, sorted by name.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be read.
    async fn list_files(&self, dir: &Path, extension: &str) -> LogResult<Vec<PathBuf>>;

    /// Creates a directory and all parent directories.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    async fn create_dir_all(&self, path: &Path) -> LogResult<()>;
}

/// A handle to an open file for reading and writing.
#[async_trait]
pub trait StorageFile: Send + Sync {
    /// Writes data at the specified offset.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    async fn write_at(&self, offset: u64, data: &[u8]) -> LogResult<()>;

    /// Reads the entire file contents.
    ///
    /// # Errors
    /// Returns an error if the read fails.
    async fn read_all(&self) -> LogResult<Bytes>;

    /// Syncs all buffered data to disk.
    ///
    /// # Errors
    /// Returns an error if the sync fails.
    async fn sync(&self) -> LogResult<()>;

    /// Returns the current file size in bytes.
    ///
    /// # Errors
    /// Returns an error if the size cannot be determined.
    async fn size(&self) -> LogResult<u64>;

    /// Truncates the file to the specified length.
    ///
    /// # Errors
    /// Returns an error if the truncation fails.
    async fn truncate(&self, len: u64) -> LogResult<()>;
}

/// File storage backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioStorage;

impl TokioStorage {
    /// Creates a new Tokio storage instance.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for TokioStorage {
    async fn open(&self, path: &Path) -> LogResult<Box<dyn StorageFile>> {
        let file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await
            .map_err(|e| LogError::io("open", e))?;

        Ok(Box::new(TokioFile {
            file: tokio::sync::Mutex::new(file),
        }))
    }

    async fn list_files(&self, dir: &Path, extension: &str) -> LogResult<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(dir)
            .await
            .map_err(|e| LogError::io("read_dir", e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LogError::io("read_dir_entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == extension) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    async fn create_dir_all(&self, path: &Path) -> LogResult<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| LogError::io("create_dir_all", e))
    }
}

struct TokioFile {
    file: tokio::sync::Mutex<tokio::fs::File>,
}

#[allow(clippy::significant_drop_tightening)]
#[async_trait]
impl StorageFile for TokioFile {
    async fn write_at(&self, offset: u64, data: &[u8]) -> LogResult<()> {
        use tokio::io::{AsyncSeekExt, AsyncWriteExt};

        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| LogError::io("seek", e))?;
        file.write_all(data)
            .await
            .map_err(|e| LogError::io("write", e))?;
        file.flush().await.map_err(|e| LogError::io("flush", e))
    }

    async fn read_all(&self) -> LogResult<Bytes> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let mut file = self.file.lock().await;
        file.seek(std::io::SeekFrom::Start(0))
            .await
            .map_err(|e| LogError::io("seek", e))?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .await
            .map_err(|e| LogError::io("read", e))?;
        Ok(Bytes::from(buf))
    }

    async fn sync(&self) -> LogResult<()> {
        let file = self.file.lock().await;
        file.sync_all().await.map_err(|e| LogError::io("sync", e))
    }

    async fn size(&self) -> LogResult<u64> {
        let file = self.file.lock().await;
        let metadata = file
            .metadata()
            .await
            .map_err(|e| LogError::io("metadata", e))?;
        Ok(metadata.len())
    }

    async fn truncate(&self, len: u64) -> LogResult<()> {
        let file = self.file.lock().await;
        file.set_len(len)
            .await
            .map_err(|e| LogError::io("truncate", e))
    }
}
