//! The set of storage backends the services run against.

use std::sync::Arc;

use sqlx::PgPool;

use abc_retail_core::{Customer, Order, Product};

use crate::config::StorefrontConfig;
use crate::db::{EntityStore, MemoryEntityStore, PgEntityStore, StoreError};
use crate::files::{DocumentStore, LocalDocumentStore, MemoryDocumentStore, ProductImages};
use crate::queue::{EventQueue, MemoryEventQueue, PgEventQueue};

/// Storage backends shared by every service.
///
/// Cheap to clone; every backend is reference counted.
#[derive(Clone)]
pub struct Backends {
    pub customers: Arc<dyn EntityStore<Customer>>,
    pub products: Arc<dyn EntityStore<Product>>,
    pub orders: Arc<dyn EntityStore<Order>>,
    pub audit: Arc<dyn EventQueue>,
    pub documents: Arc<dyn DocumentStore>,
    pub images: ProductImages,
}

impl Backends {
    /// Production backends: `PostgreSQL` for entities and the audit queue,
    /// the local filesystem for invoices and product pictures.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if a configured container name is
    /// not a valid identifier.
    pub fn postgres(pool: &PgPool, config: &StorefrontConfig) -> Result<Self, StoreError> {
        let names = &config.containers;
        let documents: Arc<dyn DocumentStore> =
            Arc::new(LocalDocumentStore::new(config.file_share_root.clone()));
        Ok(Self {
            customers: Arc::new(PgEntityStore::<Customer>::new(pool.clone(), &names.customers)?),
            products: Arc::new(PgEntityStore::<Product>::new(pool.clone(), &names.products)?),
            orders: Arc::new(PgEntityStore::<Order>::new(pool.clone(), &names.orders)?),
            audit: Arc::new(PgEventQueue::new(pool.clone(), &names.queue)?),
            images: ProductImages::new(documents.clone(), &names.images, &config.base_url),
            documents,
        })
    }

    /// Create every container, the queue and the share if absent.
    ///
    /// # Errors
    ///
    /// Returns the first provisioning failure.
    pub async fn provision(&self) -> Result<(), StoreError> {
        self.customers.ensure_container().await?;
        self.products.ensure_container().await?;
        self.orders.ensure_container().await?;
        self.audit.ensure_queue().await?;
        self.documents.ensure_share().await?;
        self.images.ensure().await?;
        tracing::info!(queue = self.audit.name(), "Storage provisioned");
        Ok(())
    }
}

/// In-memory backends with their concrete types kept, so tests can inspect
/// contents and inject faults.
#[derive(Clone)]
pub struct MemoryBackends {
    pub customers: Arc<MemoryEntityStore<Customer>>,
    pub products: Arc<MemoryEntityStore<Product>>,
    pub orders: Arc<MemoryEntityStore<Order>>,
    pub audit: Arc<MemoryEventQueue>,
    pub documents: Arc<MemoryDocumentStore>,
}

impl Default for MemoryBackends {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackends {
    #[must_use]
    pub fn new() -> Self {
        Self {
            customers: Arc::new(MemoryEntityStore::new()),
            products: Arc::new(MemoryEntityStore::new()),
            orders: Arc::new(MemoryEntityStore::new()),
            audit: Arc::new(MemoryEventQueue::new("audit-events")),
            documents: Arc::new(MemoryDocumentStore::new()),
        }
    }

    /// Type-erased view for the services.
    #[must_use]
    pub fn backends(&self) -> Backends {
        Backends {
            customers: self.customers.clone(),
            products: self.products.clone(),
            orders: self.orders.clone(),
            audit: self.audit.clone(),
            images: ProductImages::new(self.documents.clone(), "product-images", ""),
            documents: self.documents.clone(),
        }
    }
}
