//! Document store on the local filesystem.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::instrument;

use super::{DocumentStore, file_path, validate_segment};
use crate::db::StoreError;

/// Share rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalDocumentStore {
    root: PathBuf,
}

impl LocalDocumentStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn directory_path(&self, directory: &str) -> Result<PathBuf, StoreError> {
        validate_segment(directory)?;
        Ok(self.root.join(directory))
    }

    fn file_path(&self, directory: &str, file_name: &str) -> Result<PathBuf, StoreError> {
        validate_segment(file_name)?;
        Ok(self.directory_path(directory)?.join(file_name))
    }
}

fn io_failure(context: impl Into<String>, err: std::io::Error) -> StoreError {
    StoreError::failure(context, err)
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn ensure_share(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_failure(format!("create share {}", self.root.display()), e))
    }

    async fn create_directory(&self, directory: &str) -> Result<(), StoreError> {
        let path = self.directory_path(directory)?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| io_failure(format!("create directory {directory}"), e))
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    async fn upload_file(
        &self,
        directory: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), StoreError> {
        let path = self.file_path(directory, file_name)?;
        self.create_directory(directory).await?;
        let location = file_path(directory, file_name);

        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| io_failure(format!("create {location}"), e))?;
        file.write_all(content)
            .await
            .map_err(|e| io_failure(format!("write {location}"), e))?;
        file.sync_all()
            .await
            .map_err(|e| io_failure(format!("flush {location}"), e))
    }

    async fn download_file(
        &self,
        directory: &str,
        file_name: &str,
    ) -> Result<Vec<u8>, StoreError> {
        let path = self.file_path(directory, file_name)?;
        let location = file_path(directory, file_name);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StoreError::not_found("file", &location)
            } else {
                io_failure(format!("read {location}"), e)
            }
        })
    }

    async fn delete_file(&self, directory: &str, file_name: &str) -> Result<(), StoreError> {
        let path = self.file_path(directory, file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_failure(
                format!("delete {}", file_path(directory, file_name)),
                e,
            )),
        }
    }

    async fn delete_directory(&self, directory: &str) -> Result<(), StoreError> {
        let path = self.directory_path(directory)?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_failure(format!("delete directory {directory}"), e)),
        }
    }
}
