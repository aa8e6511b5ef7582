//! Product pictures, kept as files in one directory of the document store.
//!
//! A product's picture is stored under `{row_key}{extension}` and referenced
//! from the product by its public URL, `{base_url}/images/{name}`.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tracing::instrument;

use abc_retail_core::models::product::{ALLOWED_IMAGE_EXTENSIONS, validate_image_reference};

use super::{DocumentStore, validate_segment};
use crate::db::StoreError;

/// An uploaded picture as it arrives in a request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageUpload {
    /// Client-side file name; only its extension is kept.
    pub file_name: String,
    /// File content, standard base64.
    pub content_base64: String,
}

impl ImageUpload {
    /// Lower-cased extension of the uploaded file, including the dot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` unless the file is a `.jpg` or `.png`.
    pub fn extension(&self) -> Result<&'static str, StoreError> {
        validate_image_reference(&self.file_name)
            .map_err(|e| StoreError::Validation(e.to_string()))?;
        let lower = self.file_name.to_ascii_lowercase();
        ALLOWED_IMAGE_EXTENSIONS
            .iter()
            .copied()
            .find(|ext| lower.ends_with(ext))
            .ok_or_else(|| {
                StoreError::Validation(format!("`{}` has no image extension", self.file_name))
            })
    }

    /// Decoded file content.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the content is not base64 or is empty.
    pub fn bytes(&self) -> Result<Vec<u8>, StoreError> {
        let bytes = STANDARD
            .decode(self.content_base64.trim())
            .map_err(|e| StoreError::Validation(format!("image content is not base64: {e}")))?;
        if bytes.is_empty() {
            return Err(StoreError::Validation("image content is empty".to_owned()));
        }
        Ok(bytes)
    }
}

/// The product picture directory.
#[derive(Clone)]
pub struct ProductImages {
    store: Arc<dyn DocumentStore>,
    directory: String,
    url_prefix: String,
}

impl ProductImages {
    /// Pictures kept in `directory` of `store`, served below `base_url`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, directory: impl Into<String>, base_url: &str) -> Self {
        Self {
            store,
            directory: directory.into(),
            url_prefix: format!("{}/images", base_url.trim_end_matches('/')),
        }
    }

    /// Create the picture directory if absent.
    ///
    /// # Errors
    ///
    /// Returns the document store failure.
    pub async fn ensure(&self) -> Result<(), StoreError> {
        self.store.create_directory(&self.directory).await
    }

    /// Public URL of the picture called `name`.
    #[must_use]
    pub fn url(&self, name: &str) -> String {
        format!("{}/{name}", self.url_prefix)
    }

    /// Name of the stored picture a URL points at, if it is one of ours.
    ///
    /// Pictures hosted elsewhere give `None`.
    #[must_use]
    pub fn name_from_url(&self, url: &str) -> Option<String> {
        let name = url.strip_prefix(&self.url_prefix)?.strip_prefix('/')?;
        validate_segment(name).ok()?;
        Some(name.to_owned())
    }

    /// Store `upload` as the picture of the product with row key `row_key`,
    /// replacing any earlier picture of the same name. Returns the URL.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` for a bad upload and the document
    /// store failure otherwise.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    pub async fn upload(&self, row_key: &str, upload: &ImageUpload) -> Result<String, StoreError> {
        let name = format!("{row_key}{}", upload.extension()?);
        let bytes = upload.bytes()?;
        self.store.upload_file(&self.directory, &name, &bytes).await?;
        tracing::info!(name = %name, size = bytes.len(), "Product image stored");
        Ok(self.url(&name))
    }

    /// Content of the picture called `name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` for an unknown picture.
    pub async fn download(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        self.store.download_file(&self.directory, name).await
    }

    /// Remove the picture behind `url` if it is one of ours. Returns whether
    /// anything was addressed.
    ///
    /// # Errors
    ///
    /// Returns the document store failure.
    pub async fn delete_url(&self, url: &str) -> Result<bool, StoreError> {
        let Some(name) = self.name_from_url(url) else {
            return Ok(false);
        };
        self.store.delete_file(&self.directory, &name).await?;
        tracing::info!(name = %name, "Product image deleted");
        Ok(true)
    }
}

/// Content type of a stored picture, by extension.
#[must_use]
pub fn content_type(name: &str) -> &'static str {
    if name.to_ascii_lowercase().ends_with(".png") {
        "image/png"
    } else {
        "image/jpeg"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::files::MemoryDocumentStore;

    fn upload(file_name: &str, content: &[u8]) -> ImageUpload {
        ImageUpload {
            file_name: file_name.to_owned(),
            content_base64: STANDARD.encode(content),
        }
    }

    #[test]
    fn test_extension() {
        assert_eq!(upload("Shoe.PNG", b"x").extension().unwrap(), ".png");
        assert_eq!(upload("shoe.jpg", b"x").extension().unwrap(), ".jpg");
        assert!(upload("shoe.gif", b"x").extension().is_err());
        assert!(upload("shoe", b"x").extension().is_err());
    }

    #[test]
    fn test_bytes_rejects_bad_content() {
        let mut bad = upload("shoe.png", b"x");
        bad.content_base64 = "not base64!".to_owned();
        assert!(matches!(bad.bytes(), Err(StoreError::Validation(_))));
        assert!(matches!(upload("shoe.png", b"").bytes(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_name_from_url() {
        let store = Arc::new(MemoryDocumentStore::new());
        let images = ProductImages::new(store, "product-images", "https://shop.example/");
        assert_eq!(images.url("a.png"), "https://shop.example/images/a.png");
        assert_eq!(
            images.name_from_url("https://shop.example/images/a.png").as_deref(),
            Some("a.png")
        );
        assert_eq!(images.name_from_url("https://cdn.example/images/a.png"), None);
        assert_eq!(images.name_from_url("https://shop.example/images/../x.png"), None);
        assert_eq!(images.name_from_url("https://shop.example/images/"), None);
    }

    #[tokio::test]
    async fn test_upload_download_delete() {
        let store = Arc::new(MemoryDocumentStore::new());
        let images = ProductImages::new(store.clone(), "product-images", "");

        let url = images.upload("row-1", &upload("Shoe.png", b"\x89PNG")).await.unwrap();
        assert_eq!(url, "/images/row-1.png");
        assert_eq!(store.list("product-images").await, ["row-1.png"]);
        assert_eq!(images.download("row-1.png").await.unwrap(), b"\x89PNG");

        assert!(!images.delete_url("https://cdn.example/shoe.png").await.unwrap());
        assert!(images.delete_url(&url).await.unwrap());
        assert_eq!(store.file_count().await, 0);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("a.png"), "image/png");
        assert_eq!(content_type("a.JPG"), "image/jpeg");
    }
}
