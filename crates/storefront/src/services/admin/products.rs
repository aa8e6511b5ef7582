//! Catalogue administration.

use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use abc_retail_core::{Entity, EntityKey, Filter, Price, Product, VersionToken};

use super::{AdminError, AdminService};
use crate::db::{StoreError, collect};
use crate::files::ImageUpload;
use crate::models::SessionIdentity;

/// Editable product fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    /// Business ID; generated on create when absent.
    #[serde(default)]
    pub product_id: Option<String>,
    pub name: String,
    pub description: String,
    pub price: Price,
    #[serde(default)]
    pub image_url: Option<String>,
    /// New picture to store; its URL replaces `image_url`.
    #[serde(default)]
    pub image: Option<ImageUpload>,
}

impl ProductInput {
    /// Copy the fields onto `product`. An absent or blank product ID keeps
    /// the current one. The picture upload, if any, is handed back.
    pub fn apply_to(self, product: &mut Product) -> Option<ImageUpload> {
        if let Some(product_id) = self.product_id.filter(|id| !id.trim().is_empty()) {
            product.product_id = product_id.trim().to_owned();
        }
        product.name = self.name.trim().to_owned();
        product.description = self.description.trim().to_owned();
        product.price = self.price;
        product.image_url = self.image_url.filter(|url| !url.trim().is_empty());
        self.image
    }
}

fn generate_product_id() -> String {
    let id = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    id.chars().take(8).collect()
}

impl AdminService<'_> {
    /// Every catalogue product, sorted by name. Does not require a session.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` if the query fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, AdminError> {
        let filter = Filter::eq("partition_key", Product::PARTITION);
        let mut products = collect(self.backends.products.as_ref(), filter).await?;
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    /// A single product. Does not require a session.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` with `NotFound` if there is no such product.
    pub async fn get_product(&self, key: &EntityKey) -> Result<Product, AdminError> {
        Ok(self
            .backends
            .products
            .get(&key.partition_key, &key.row_key)
            .await?)
    }

    /// Add a product to the catalogue, storing its picture first when one is
    /// uploaded.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators,
    /// `AdminError::Validation` for malformed fields and `AdminError::Store`
    /// if the picture or the product cannot be stored.
    #[instrument(skip(self, session, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        session: Option<&SessionIdentity>,
        input: ProductInput,
    ) -> Result<Product, AdminError> {
        self.require_admin(session).await?;

        let mut product = Product::new(generate_product_id(), "", "", input.price, None);
        let image = input.apply_to(&mut product);
        product.validate()?;
        if let Some(image) = &image {
            let url = self.store_image(&product, image).await?;
            product.image_url = Some(url);
        }

        let uploaded = image.and(product.image_url.clone());
        let product = match self.backends.products.add(product).await {
            Ok(product) => product,
            Err(e) => {
                if let Some(url) = uploaded {
                    self.discard_image(&url).await;
                }
                return Err(e.into());
            }
        };
        tracing::info!(
            row_key = %product.meta.row_key,
            product_id = %product.product_id,
            "Product created"
        );
        self.audit("Products", "Create", format!("Product {} created.", product.name))
            .await;
        Ok(product)
    }

    /// Replace a product, provided nobody has written it since `expected`
    /// was read.
    ///
    /// An uploaded `image` is stored and becomes the product's picture. A
    /// stored picture the product no longer references is removed once the
    /// write succeeds.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators,
    /// `AdminError::Validation` for malformed fields and `AdminError::Store`
    /// with `NotFound` or `Conflict` from the conditional write.
    #[instrument(skip(self, session, product, image), fields(row_key = %product.meta.row_key))]
    pub async fn update_product(
        &self,
        session: Option<&SessionIdentity>,
        mut product: Product,
        expected: &VersionToken,
        image: Option<&ImageUpload>,
    ) -> Result<Product, AdminError> {
        self.require_admin(session).await?;
        product.validate()?;

        let previous = self.get_product(&product.key()).await?.image_url;
        let mut uploaded = None;
        if let Some(image) = image {
            let url = self.store_image(&product, image).await?;
            product.image_url = Some(url.clone());
            uploaded = Some(url).filter(|url| previous.as_ref() != Some(url));
        }

        let product = match self.backends.products.update(product, expected).await {
            Ok(product) => product,
            Err(e) => {
                if let Some(url) = uploaded {
                    self.discard_image(&url).await;
                }
                return Err(e.into());
            }
        };
        if let Some(old) = previous.filter(|old| product.image_url.as_ref() != Some(old)) {
            self.discard_image(&old).await;
        }
        self.audit("Products", "Update", format!("Product {} updated.", product.name))
            .await;
        Ok(product)
    }

    /// Remove a product and its stored picture from the catalogue.
    ///
    /// Orders referencing the product are left as they are. Pictures hosted
    /// elsewhere are not touched.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Auth` for non-administrators and
    /// `AdminError::Store` with `NotFound` if there is no such product or the
    /// picture cannot be removed.
    #[instrument(skip(self, session))]
    pub async fn delete_product(
        &self,
        session: Option<&SessionIdentity>,
        key: &EntityKey,
    ) -> Result<(), AdminError> {
        self.require_admin(session).await?;

        let product = self.get_product(key).await?;
        if let Some(url) = &product.image_url {
            self.backends.images.delete_url(url).await?;
        }
        self.backends
            .products
            .delete(&key.partition_key, &key.row_key)
            .await?;
        self.audit("Products", "Delete", format!("Product {} deleted.", product.name))
            .await;
        Ok(())
    }

    async fn store_image(
        &self,
        product: &Product,
        image: &ImageUpload,
    ) -> Result<String, AdminError> {
        self.backends
            .images
            .upload(product.meta.row_key.as_str(), image)
            .await
            .map_err(|e| match e {
                StoreError::Validation(message) => AdminError::Validation(message),
                other => AdminError::Store(other),
            })
    }

    /// Remove a stored picture nothing references any more. Failures are
    /// logged and left behind.
    async fn discard_image(&self, url: &str) {
        if let Err(error) = self.backends.images.delete_url(url).await {
            tracing::warn!(error = %error, url = %url, "Failed to remove product image");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use abc_retail_core::{AuditEvent, Entity};

    use super::*;
    use crate::backends::MemoryBackends;
    use crate::db::{StoreError, expected_version};
    use crate::services::admin::test_support::{admin_session, registration};
    use crate::services::auth::{AuthError, AuthService};

    fn input(name: &str) -> ProductInput {
        ProductInput {
            product_id: None,
            name: name.to_owned(),
            description: "A comfortable everyday sneaker".to_owned(),
            price: Price::try_from(100.0).unwrap(),
            image_url: Some("https://cdn.example/shoe.png".to_owned()),
            image: None,
        }
    }

    fn picture(file_name: &str, content: &[u8]) -> ImageUpload {
        use base64::{Engine, engine::general_purpose::STANDARD};

        ImageUpload {
            file_name: file_name.to_owned(),
            content_base64: STANDARD.encode(content),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_sorted_by_name() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        admin.create_product(Some(&session), input("Trail")).await.unwrap();
        let runner = admin.create_product(Some(&session), input("Runner")).await.unwrap();
        assert_eq!(runner.meta.partition_key.as_str(), Product::PARTITION);
        assert_eq!(runner.product_id.len(), 8);
        assert!(runner.version().is_some());

        let names: Vec<String> = admin
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Runner", "Trail"]);

        let events = memory.audit.decoded::<AuditEvent>().await.unwrap();
        let last = events.last().unwrap();
        assert_eq!(last.table_name.as_deref(), Some("Products"));
        assert_eq!(last.description, "Product Runner created.");
    }

    #[tokio::test]
    async fn test_create_requires_admin() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let admin = AdminService::new(&backends);

        assert!(matches!(
            admin.create_product(None, input("Runner")).await,
            Err(AdminError::Auth(AuthError::Unauthorized))
        ));

        let shopper = AuthService::new(&backends)
            .register(registration("Thandi Mokoena", "thandi@example.com"))
            .await
            .unwrap();
        let session = SessionIdentity::for_customer(&shopper).unwrap();
        assert!(matches!(
            admin.create_product(Some(&session), input("Runner")).await,
            Err(AdminError::Auth(AuthError::Forbidden))
        ));
        assert!(memory.products.is_empty().await);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_fields() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        let mut bad = input("Runner");
        bad.description = "short".to_owned();
        assert!(matches!(
            admin.create_product(Some(&session), bad).await,
            Err(AdminError::Validation(_))
        ));

        let mut bad = input("Runner");
        bad.image_url = Some("shoe.gif".to_owned());
        assert!(matches!(
            admin.create_product(Some(&session), bad).await,
            Err(AdminError::Validation(_))
        ));
        assert!(memory.products.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_uses_version() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);
        let product = admin.create_product(Some(&session), input("Runner")).await.unwrap();
        let version = expected_version(&product).unwrap();

        let mut renamed = product.clone();
        input("Runner Pro").apply_to(&mut renamed);
        let updated = admin
            .update_product(Some(&session), renamed.clone(), &version, None)
            .await
            .unwrap();
        assert_eq!(updated.name, "Runner Pro");
        assert_eq!(updated.product_id, product.product_id);

        // The first version is now stale.
        assert!(matches!(
            admin.update_product(Some(&session), renamed, &version, None).await,
            Err(AdminError::Store(StoreError::Conflict { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);
        let product = admin.create_product(Some(&session), input("Runner")).await.unwrap();

        admin.delete_product(Some(&session), &product.key()).await.unwrap();
        assert!(memory.products.is_empty().await);
        assert!(matches!(
            admin.delete_product(Some(&session), &product.key()).await,
            Err(AdminError::Store(StoreError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn test_create_stores_uploaded_image() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        let mut with_image = input("Runner");
        with_image.image = Some(picture("Runner.PNG", b"\x89PNG"));
        let product = admin.create_product(Some(&session), with_image).await.unwrap();

        let name = format!("{}.png", product.meta.row_key);
        assert_eq!(product.image_url.as_deref(), Some(format!("/images/{name}").as_str()));
        assert_eq!(memory.documents.list("product-images").await, [name.clone()]);
        assert_eq!(backends.images.download(&name).await.unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_image_before_storing() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        let mut bad = input("Runner");
        bad.image = Some(picture("runner.gif", b"GIF89a"));
        assert!(matches!(
            admin.create_product(Some(&session), bad).await,
            Err(AdminError::Validation(_))
        ));

        let mut bad = input("Runner");
        bad.image = Some(ImageUpload {
            file_name: "runner.png".to_owned(),
            content_base64: "not base64!".to_owned(),
        });
        assert!(matches!(
            admin.create_product(Some(&session), bad).await,
            Err(AdminError::Validation(_))
        ));
        assert!(memory.products.is_empty().await);
        assert_eq!(memory.documents.file_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_create_removes_uploaded_image() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        memory.products.set_failing(true);
        let mut with_image = input("Runner");
        with_image.image = Some(picture("runner.jpg", b"JFIF"));
        assert!(matches!(
            admin.create_product(Some(&session), with_image).await,
            Err(AdminError::Store(StoreError::StorageFailure { .. }))
        ));
        assert_eq!(memory.documents.file_count().await, 0);
    }

    #[tokio::test]
    async fn test_update_replaces_image() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        let mut with_image = input("Runner");
        with_image.image = Some(picture("runner.jpg", b"JFIF"));
        let product = admin.create_product(Some(&session), with_image).await.unwrap();
        let version = expected_version(&product).unwrap();
        let old_url = product.image_url.clone().unwrap();

        let updated = admin
            .update_product(
                Some(&session),
                product.clone(),
                &version,
                Some(&picture("runner.png", b"\x89PNG")),
            )
            .await
            .unwrap();
        let name = format!("{}.png", product.meta.row_key);
        assert_eq!(updated.image_url, Some(format!("/images/{name}")));
        assert_ne!(updated.image_url.as_deref(), Some(old_url.as_str()));
        assert_eq!(memory.documents.list("product-images").await, [name]);
    }

    #[tokio::test]
    async fn test_update_to_external_url_removes_stored_image() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        let mut with_image = input("Runner");
        with_image.image = Some(picture("runner.jpg", b"JFIF"));
        let product = admin.create_product(Some(&session), with_image).await.unwrap();
        let version = expected_version(&product).unwrap();

        let mut edited = product.clone();
        assert!(input("Runner").apply_to(&mut edited).is_none());
        admin
            .update_product(Some(&session), edited, &version, None)
            .await
            .unwrap();
        assert_eq!(memory.documents.file_count().await, 0);
    }

    #[tokio::test]
    async fn test_stale_update_keeps_current_image() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        let mut with_image = input("Runner");
        with_image.image = Some(picture("runner.jpg", b"JFIF"));
        let product = admin.create_product(Some(&session), with_image).await.unwrap();
        let version = expected_version(&product).unwrap();
        admin
            .update_product(Some(&session), product.clone(), &version, None)
            .await
            .unwrap();

        // The first version is stale, so the new picture is discarded.
        assert!(matches!(
            admin
                .update_product(
                    Some(&session),
                    product.clone(),
                    &version,
                    Some(&picture("runner.png", b"\x89PNG")),
                )
                .await,
            Err(AdminError::Store(StoreError::Conflict { .. }))
        ));
        let name = format!("{}.jpg", product.meta.row_key);
        assert_eq!(memory.documents.list("product-images").await, [name]);
    }

    #[tokio::test]
    async fn test_delete_removes_stored_image_only() {
        let memory = MemoryBackends::new();
        let backends = memory.backends();
        let (_, session) = admin_session(&memory, &backends).await;
        let admin = AdminService::new(&backends);

        let mut with_image = input("Runner");
        with_image.image = Some(picture("runner.jpg", b"JFIF"));
        let stored = admin.create_product(Some(&session), with_image).await.unwrap();
        let external = admin.create_product(Some(&session), input("Trail")).await.unwrap();
        assert_eq!(memory.documents.file_count().await, 1);

        admin.delete_product(Some(&session), &stored.key()).await.unwrap();
        assert_eq!(memory.documents.file_count().await, 0);

        admin.delete_product(Some(&session), &external.key()).await.unwrap();
        assert!(memory.products.is_empty().await);
    }
}
