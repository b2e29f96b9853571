//! Session-scoped storage for uploaded files

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::models::{SessionId, StorageHandle};

/// Track store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid file name: {0}")]
    InvalidName(String),
}

/// Durable storage for uploaded tracks
///
/// `store` returns only after the content is on disk.
#[async_trait]
pub trait TrackStore: Send + Sync {
    async fn store(
        &self,
        session_id: SessionId,
        position: usize,
        filename: &str,
        content: &[u8],
    ) -> Result<StorageHandle, StoreError>;

    /// Filesystem location of a stored file
    fn path_of(&self, handle: &StorageHandle) -> PathBuf;

    /// Remove one stored file
    async fn discard(&self, handle: &StorageHandle) -> Result<(), StoreError>;

    /// Remove everything stored for a session
    async fn remove_session(&self, session_id: SessionId) -> Result<(), StoreError>;
}

/// Track store rooted at a directory, one subdirectory per session
#[derive(Debug, Clone)]
pub struct FsTrackStore {
    root: PathBuf,
}

impl FsTrackStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, session_id: SessionId) -> PathBuf {
        self.root.join(session_id.to_string())
    }
}

/// Write to `partial`, flush to disk, then rename into `dest`
async fn write_durably(partial: &Path, dest: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(partial).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(partial, dest).await
}

#[async_trait]
impl TrackStore for FsTrackStore {
    async fn store(
        &self,
        session_id: SessionId,
        position: usize,
        filename: &str,
        content: &[u8],
    ) -> Result<StorageHandle, StoreError> {
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(StoreError::InvalidName(filename.to_string()));
        }

        let dir = self.session_dir(session_id);
        tokio::fs::create_dir_all(&dir).await?;

        // Position prefix keeps duplicate names apart
        let stored_name = format!("{:04}_{}", position, filename);
        let final_path = dir.join(&stored_name);
        let partial_path = dir.join(format!(".{}.part", stored_name));

        if let Err(e) = write_durably(&partial_path, &final_path, content).await {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e.into());
        }

        tracing::debug!(
            session_id = %session_id,
            position,
            path = %final_path.display(),
            bytes = content.len(),
            "Stored uploaded file"
        );

        Ok(StorageHandle::new(format!("{}/{}", session_id, stored_name)))
    }

    fn path_of(&self, handle: &StorageHandle) -> PathBuf {
        self.root.join(handle.as_str())
    }

    async fn discard(&self, handle: &StorageHandle) -> Result<(), StoreError> {
        match tokio::fs::remove_file(self.path_of(handle)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_session(&self, session_id: SessionId) -> Result<(), StoreError> {
        let dir = self.session_dir(session_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
