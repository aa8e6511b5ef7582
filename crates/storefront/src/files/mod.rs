//! Hierarchical document storage for generated invoices and product images.
//!
//! A share holds directories, directories hold files. Directory and file
//! names are single path segments; anything that could escape the share
//! (separators, `..`, control characters) is rejected with `Validation`.

pub mod images;
pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::db::StoreError;

pub use images::{ImageUpload, ProductImages};
pub use local::LocalDocumentStore;
pub use memory::MemoryDocumentStore;

/// A file share of directories and files.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the share root if absent. Idempotent.
    async fn ensure_share(&self) -> Result<(), StoreError>;

    /// Create `directory` if absent. Idempotent.
    async fn create_directory(&self, directory: &str) -> Result<(), StoreError>;

    /// Write `content` to `directory/file_name`, replacing any existing file.
    ///
    /// The directory is created if absent. The file is created first and
    /// written second, so a failure between the two steps can leave an empty
    /// file behind.
    async fn upload_file(
        &self,
        directory: &str,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), StoreError>;

    /// Read back `directory/file_name`.
    async fn download_file(&self, directory: &str, file_name: &str)
    -> Result<Vec<u8>, StoreError>;

    /// Remove one file. Absent files are fine.
    async fn delete_file(&self, directory: &str, file_name: &str) -> Result<(), StoreError>;

    /// Remove `directory` and everything in it. Absent directories are fine.
    async fn delete_directory(&self, directory: &str) -> Result<(), StoreError>;
}

/// Check `name` is a single safe path segment.
///
/// # Errors
///
/// Returns `StoreError::Validation` naming the offending segment.
pub fn validate_segment(name: &str) -> Result<(), StoreError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.len() > 255
        || name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':') || c.is_control());
    if invalid {
        return Err(StoreError::Validation(format!(
            "`{name}` is not a valid file or directory name"
        )));
    }
    Ok(())
}

/// Display form of a file location, for errors and logs.
#[must_use]
pub fn file_path(directory: &str, file_name: &str) -> String {
    format!("{directory}/{file_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_segment() {
        assert!(validate_segment("Thandi M_Runner_Invoice.html").is_ok());
        assert!(validate_segment("Customer-1234").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "c:", "new\nline"] {
            assert!(validate_segment(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
