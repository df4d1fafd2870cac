use std::io;
use std::path::PathBuf;

use tokio::io::AsyncWriteExt;

use crate::application::ports::{StorageError, TransientFile, TransientStore};
use crate::domain::ScratchFileName;

/// Scratch-directory storage for uploads that only live for one request.
pub struct LocalTransientStore {
    base_path: PathBuf,
}

impl LocalTransientStore {
    pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&base_path).map_err(StorageError::Io)?;
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }
}

#[async_trait::async_trait]
impl TransientStore for LocalTransientStore {
    async fn acquire(
        &self,
        data: &[u8],
        suggested_name: &str,
    ) -> Result<TransientFile, StorageError> {
        let name = ScratchFileName::new(suggested_name);
        let path = self.base_path.join(name.as_str());

        let mut handle = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::PersistFailed(format!("{}: {}", path.display(), e)))?;

        // From here on the guard owns the path, so a failed write still cleans up.
        let file = TransientFile::new(path);

        handle
            .write_all(data)
            .await
            .map_err(|e| StorageError::PersistFailed(e.to_string()))?;
        handle
            .flush()
            .await
            .map_err(|e| StorageError::PersistFailed(e.to_string()))?;

        tracing::debug!(
            path = %file.path().display(),
            bytes = data.len(),
            "Upload persisted"
        );

        Ok(file)
    }

    async fn release(&self, file: TransientFile) -> Result<(), StorageError> {
        match tokio::fs::remove_file(file.path()).await {
            Ok(()) => {
                tracing::debug!(path = %file.path().display(), "Upload released");
                file.disarm();
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                file.disarm();
                Ok(())
            }
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "{}: {}",
                file.path().display(),
                e
            ))),
        }
    }
}
