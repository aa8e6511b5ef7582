//! In-process document store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, file_path, validate_segment};
use crate::db::StoreError;

type Directory = BTreeMap<String, Vec<u8>>;

/// Document store kept in memory.
///
/// Fault injection mirrors the two-step upload: with `fail_writes` set the
/// file is created empty and the write then fails.
#[derive(Default)]
pub struct MemoryDocumentStore {
    directories: RwLock<BTreeMap<String, Directory>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, failing: bool) {
        self.fail_writes.store(failing, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, failing: bool) {
        self.fail_reads.store(failing, Ordering::SeqCst);
    }

    /// Names of the files in `directory`, sorted.
    pub async fn list(&self, directory: &str) -> Vec<String> {
        self.directories
            .read()
            .await
            .get(directory)
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of stored files across all directories.
    pub async fn file_count(&self) -> usize {
        self.directories.read().await.values().map(BTreeMap::len).sum()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ensure_share(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_directory(&self, directory: &str) -> Result<(), StoreError> {
        validate_segment(directory)?;
        self.directories
            .write()
            .await
            .entry(directory.to_owned())
            .or_default();
        Ok(())
    }

    async fn upload_file(
        &self,
        directory: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), StoreError> {
        validate_segment(directory)?;
        validate_segment(file_name)?;
        let mut directories = self.directories.write().await;
        let files = directories.entry(directory.to_owned()).or_default();

        // Create step.
        files.insert(file_name.to_owned(), Vec::new());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::failure(
                format!("write {}", file_path(directory, file_name)),
                "injected fault",
            ));
        }
        files.insert(file_name.to_owned(), content.to_vec());
        Ok(())
    }

    async fn download_file(
        &self,
        directory: &str,
        file_name: &str,
    ) -> Result<Vec<u8>, StoreError> {
        validate_segment(directory)?;
        validate_segment(file_name)?;
        let location = file_path(directory, file_name);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::failure(format!("read {location}"), "injected fault"));
        }
        self.directories
            .read()
            .await
            .get(directory)
            .and_then(|files| files.get(file_name))
            .cloned()
            .ok_or_else(|| StoreError::not_found("file", location))
    }

    async fn delete_file(&self, directory: &str, file_name: &str) -> Result<(), StoreError> {
        validate_segment(directory)?;
        validate_segment(file_name)?;
        if let Some(files) = self.directories.write().await.get_mut(directory) {
            files.remove(file_name);
        }
        Ok(())
    }

    async fn delete_directory(&self, directory: &str) -> Result<(), StoreError> {
        validate_segment(directory)?;
        self.directories.write().await.remove(directory);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_write_leaves_empty_file() {
        let store = MemoryDocumentStore::new();
        store.set_fail_writes(true);
        let err = store.upload_file("dir", "a.html", b"body").await.unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure { .. }));

        store.set_fail_writes(false);
        assert_eq!(store.download_file("dir", "a.html").await.unwrap(), b"");
    }

    #[tokio::test]
    async fn test_delete_directory_removes_files() {
        let store = MemoryDocumentStore::new();
        store.upload_file("a", "1.html", b"1").await.unwrap();
        store.upload_file("a", "2.html", b"2").await.unwrap();
        store.upload_file("b", "3.html", b"3").await.unwrap();
        assert_eq!(store.list("a").await, ["1.html", "2.html"]);

        store.delete_directory("a").await.unwrap();
        assert_eq!(store.file_count().await, 1);
        assert!(store.download_file("a", "1.html").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_file_is_idempotent() {
        let store = MemoryDocumentStore::new();
        store.upload_file("images", "a.png", b"a").await.unwrap();
        store.upload_file("images", "b.png", b"b").await.unwrap();

        store.delete_file("images", "a.png").await.unwrap();
        store.delete_file("images", "a.png").await.unwrap();
        store.delete_file("missing", "a.png").await.unwrap();
        assert_eq!(store.list("images").await, ["b.png"]);
    }
}
