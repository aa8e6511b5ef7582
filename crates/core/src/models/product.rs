//! Catalogue products.

use serde::{Deserialize, Serialize};

use crate::entity::EntityMetadata;
use crate::impl_entity;
use crate::types::Price;
use crate::validation::{ValidationError, min_chars};

/// Image file extensions accepted for product pictures.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".png"];

/// A product offered in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub meta: EntityMetadata,
    pub product_id: String,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl_entity!(
    Product,
    "product",
    ["product_id", "name", "description", "price"]
);

impl Product {
    /// Partition every catalogue product lives in.
    pub const PARTITION: &'static str = "Sneaker";

    /// Build a new, not yet stored product with a fresh row key.
    #[must_use]
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Price,
        image_url: Option<String>,
    ) -> Self {
        Self {
            meta: EntityMetadata::fresh(Self::PARTITION),
            product_id: product_id.into(),
            name: name.into(),
            description: description.into(),
            price,
            image_url,
        }
    }

    /// Check name, description and image reference.
    ///
    /// Price non-negativity is already guaranteed by [`Price`].
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        min_chars("name", &self.name, 2)?;
        min_chars("description", &self.description, 10)?;
        if let Some(url) = &self.image_url {
            validate_image_reference(url)?;
        }
        Ok(())
    }
}

/// Only `.jpg` and `.png` images are accepted.
///
/// # Errors
///
/// Returns a `ValidationError` on `image_url`.
pub fn validate_image_reference(url: &str) -> Result<(), ValidationError> {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
    if ALLOWED_IMAGE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(ext))
    {
        Ok(())
    } else {
        Err(ValidationError::new(
            "image_url",
            format!("only {} files are allowed", ALLOWED_IMAGE_EXTENSIONS.join(", ")),
        ))
    }
}
