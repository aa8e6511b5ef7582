//! In-process entity store.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::RwLock;

use abc_retail_core::{Entity, EntityKey, Filter, PartitionKey, RowKey, VersionToken};

use super::{EntityStore, EntityStream, StoreError, stamp};

struct StoredEntity {
    version: VersionToken,
    document: Value,
}

/// Entity store backed by an ordered map.
///
/// Records are kept in their serialized JSON form so reads observe exactly
/// what was written. `set_failing(true)` makes every operation fail with
/// `StorageFailure`.
pub struct MemoryEntityStore<T> {
    records: RwLock<BTreeMap<(String, String), StoredEntity>>,
    failing: AtomicBool,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Entity> Default for MemoryEntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> MemoryEntityStore<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            failing: AtomicBool::new(false),
            _kind: PhantomData,
        }
    }

    /// Toggle fault injection.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn check_available(&self, operation: &str) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::failure(
                format!("{} {operation}", T::KIND),
                "injected fault",
            ));
        }
        Ok(())
    }

    fn encode(entity: &T) -> Result<Value, StoreError> {
        serde_json::to_value(entity)
            .map_err(|e| StoreError::failure(format!("{} encode", T::KIND), e))
    }

    fn decode(document: &Value) -> Result<T, StoreError> {
        serde_json::from_value(document.clone())
            .map_err(|e| StoreError::failure(format!("{} decode", T::KIND), e))
    }
}

fn map_key(key: &EntityKey) -> (String, String) {
    (
        key.partition_key.as_str().to_owned(),
        key.row_key.as_str().to_owned(),
    )
}

#[async_trait]
impl<T: Entity> EntityStore<T> for MemoryEntityStore<T> {
    async fn ensure_container(&self) -> Result<(), StoreError> {
        self.check_available("provision")
    }

    async fn add(&self, mut entity: T) -> Result<T, StoreError> {
        self.check_available("add")?;
        let key = entity.key();
        let mut records = self.records.write().await;
        if records.contains_key(&map_key(&key)) {
            return Err(StoreError::conflict(T::KIND, key, "key already exists"));
        }
        let version = stamp(&mut entity);
        let document = Self::encode(&entity)?;
        records.insert(map_key(&key), StoredEntity { version, document });
        Ok(entity)
    }

    async fn get(&self, partition_key: &PartitionKey, row_key: &RowKey) -> Result<T, StoreError> {
        self.check_available("get")?;
        let key = EntityKey::new(partition_key.clone(), row_key.clone());
        let records = self.records.read().await;
        let stored = records
            .get(&map_key(&key))
            .ok_or_else(|| StoreError::not_found(T::KIND, &key))?;
        Self::decode(&stored.document)
    }

    async fn update(&self, mut entity: T, expected: &VersionToken) -> Result<T, StoreError> {
        self.check_available("update")?;
        let key = entity.key();
        let mut records = self.records.write().await;
        let stored = records
            .get_mut(&map_key(&key))
            .ok_or_else(|| StoreError::not_found(T::KIND, &key))?;
        if &stored.version != expected {
            return Err(StoreError::conflict(T::KIND, key, "version token is stale"));
        }
        let version = stamp(&mut entity);
        stored.document = Self::encode(&entity)?;
        stored.version = version;
        Ok(entity)
    }

    async fn delete(
        &self,
        partition_key: &PartitionKey,
        row_key: &RowKey,
    ) -> Result<(), StoreError> {
        self.check_available("delete")?;
        let key = EntityKey::new(partition_key.clone(), row_key.clone());
        self.records
            .write()
            .await
            .remove(&map_key(&key))
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found(T::KIND, key))
    }

    async fn query(&self, filter: Filter) -> Result<EntityStream<T>, StoreError> {
        filter.validate_for::<T>()?;
        self.check_available("query")?;
        let matching: Vec<Value> = self
            .records
            .read()
            .await
            .values()
            .filter(|stored| filter.matches(&stored.document))
            .map(|stored| stored.document.clone())
            .collect();
        Ok(futures::stream::iter(matching)
            .map(|document| Self::decode(&document))
            .boxed())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::TryStreamExt;
    use rust_decimal::Decimal;

    use abc_retail_core::{Price, Product};

    use super::*;
    use crate::db::expected_version;

    fn product(name: &str, price: i64) -> Product {
        Product::new(
            format!("{}001", name.to_uppercase()),
            name,
            "A comfortable everyday sneaker",
            Price::new(Decimal::from(price)).unwrap(),
            None,
        )
    }

    #[tokio::test]
    async fn test_add_assigns_version_and_timestamp() {
        let store = MemoryEntityStore::<Product>::new();
        let stored = store.add(product("Runner", 100)).await.unwrap();

        assert!(stored.meta.version.is_some());
        assert!(stored.meta.timestamp.is_some());

        let read = store
            .get(&stored.meta.partition_key, &stored.meta.row_key)
            .await
            .unwrap();
        assert_eq!(read, stored);
    }

    #[tokio::test]
    async fn test_duplicate_key_conflicts() {
        let store = MemoryEntityStore::<Product>::new();
        let first = product("Runner", 100);
        let mut second = product("Walker", 80);
        second.meta.row_key = first.meta.row_key.clone();

        let stored = store.add(first).await.unwrap();
        let err = store.add(second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.len().await, 1);

        let kept = store
            .get(&stored.meta.partition_key, &stored.meta.row_key)
            .await
            .unwrap();
        assert_eq!(kept, stored);
        assert_eq!(kept.meta.version, stored.meta.version);
        assert_eq!(
            serde_json::to_vec(&kept).unwrap(),
            serde_json::to_vec(&stored).unwrap()
        );
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryEntityStore::<Product>::new();
        let stored = store.add(product("Runner", 100)).await.unwrap();
        let stale = expected_version(&stored).unwrap();

        let mut edited = stored.clone();
        edited.name = "Runner II".to_owned();
        let updated = store.update(edited, &stale).await.unwrap();
        assert_ne!(updated.meta.version, stored.meta.version);

        let mut again = stored;
        again.name = "Runner III".to_owned();
        let err = store.update(again, &stale).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_get_and_delete_missing() {
        let store = MemoryEntityStore::<Product>::new();
        let pk = PartitionKey::new("Sneaker");
        let rk = RowKey::new("nope");
        assert!(store.get(&pk, &rk).await.unwrap_err().is_not_found());
        assert!(store.delete(&pk, &rk).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let store = MemoryEntityStore::<Product>::new();
        let stored = store.add(product("Runner", 100)).await.unwrap();
        let (pk, rk) = (&stored.meta.partition_key, &stored.meta.row_key);

        store.delete(pk, rk).await.unwrap();
        assert!(store.get(pk, rk).await.unwrap_err().is_not_found());
        assert!(store.delete(pk, rk).await.unwrap_err().is_not_found());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_query_filters() {
        let store = MemoryEntityStore::<Product>::new();
        store.add(product("Runner", 100)).await.unwrap();
        store.add(product("Walker", 80)).await.unwrap();
        store.add(product("Sprinter", 150)).await.unwrap();

        let cheap: Vec<Product> = store
            .query(Filter::le("price", 100))
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let mut names: Vec<_> = cheap.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, ["Runner", "Walker"]);

        let err = store.query(Filter::eq("colour", "red")).await.err().unwrap();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let store = MemoryEntityStore::<Product>::new();
        store.set_failing(true);
        let err = store.add(product("Runner", 100)).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageFailure { .. }));
        store.set_failing(false);
        assert!(store.is_empty().await);
    }
}
