use std::io;
use std::path::{Path, PathBuf};

/// Request-scoped upload on disk. Deleted by [`TransientStore::release`]; if the guard
/// is dropped without being released the file is removed synchronously on drop.
#[derive(Debug)]
pub struct TransientFile {
    path: PathBuf,
    armed: bool,
}

impl TransientFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Marks the backing file as already removed.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Transient file removed on drop");
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "Failed to remove transient file on drop"
                );
            }
        }
    }
}

#[async_trait::async_trait]
pub trait TransientStore: Send + Sync {
    async fn acquire(
        &self,
        data: &[u8],
        suggested_name: &str,
    ) -> Result<TransientFile, StorageError>;

    /// Deletes the file. An already-absent file is not an error.
    async fn release(&self, file: TransientFile) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to persist upload: {0}")]
    PersistFailed(String),
    #[error("failed to delete upload: {0}")]
    DeleteFailed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
