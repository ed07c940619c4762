//! Concurrent in-memory storage backend.
//!
//! The reference implementation of [`EntityStore`]: a `DashMap` of tables,
//! each a map from entity id to [`StoredEntity`]. Unique fields are declared
//! per resource type and enforced on create and update with a table scan,
//! which is acceptable at the sizes this backend targets (tests, demos,
//! embedded use).

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use dashmap::DashMap;

use turnstile_core::{ChangeSet, generate_id};
use turnstile_query::{FilterSpec, PageWindow};

use crate::error::StorageError;
use crate::traits::EntityStore;
use crate::types::{FindResult, Order, StoredEntity};

/// DashMap-backed entity store with declared unique fields.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    tables: DashMap<String, DashMap<String, StoredEntity>>,
    unique_fields: DashMap<String, Vec<String>>,
    // Unique checks scan the whole table, so the check and the write must
    // not interleave with another writer on the same resource type.
    write_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MemoryEntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field whose value must be unique across a resource type.
    ///
    /// Violations surface as `StorageError::Conflict` from `create` and
    /// `update`.
    pub fn declare_unique(&self, resource_type: impl Into<String>, field: impl Into<String>) {
        self.unique_fields
            .entry(resource_type.into())
            .or_default()
            .push(field.into());
    }

    /// Number of entities currently stored for a resource type.
    #[must_use]
    pub fn count(&self, resource_type: &str) -> usize {
        self.tables.get(resource_type).map_or(0, |t| t.len())
    }

    fn write_lock(&self, resource_type: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(resource_type.to_string())
            .or_default()
            .clone()
    }

    /// Checks declared unique fields against the table, skipping the entity
    /// with `exclude_id` (the one being updated). Callers must hold the
    /// resource type's write lock across the check and the write.
    fn check_unique(
        &self,
        resource_type: &str,
        change_set: &ChangeSet,
        exclude_id: Option<&str>,
    ) -> Result<(), StorageError> {
        let Some(fields) = self.unique_fields.get(resource_type) else {
            return Ok(());
        };
        let Some(table) = self.tables.get(resource_type) else {
            return Ok(());
        };

        for field in fields.iter() {
            let Some(value) = change_set.get(field) else {
                continue;
            };
            let taken = table.iter().any(|entry| {
                Some(entry.key().as_str()) != exclude_id
                    && entry.value().get_field(field) == Some(value)
            });
            if taken {
                return Err(StorageError::conflict(format!(
                    "value for unique field '{field}' is already taken"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn find(
        &self,
        resource_type: &str,
        filter: &FilterSpec,
        order: &Order,
        window: PageWindow,
    ) -> Result<FindResult, StorageError> {
        let Some(table) = self.tables.get(resource_type) else {
            return Ok(FindResult::empty());
        };

        let mut matched: Vec<StoredEntity> = table
            .iter()
            .filter(|entry| filter.matches(&entry.value().filter_document()))
            .map(|entry| entry.value().clone())
            .collect();

        matched.sort_by(|a, b| order.compare(a, b));
        let total = matched.len();

        let entities = matched
            .into_iter()
            .skip(window.offset)
            .take(window.limit)
            .collect();

        tracing::debug!(resource_type, total, "memory store find");
        Ok(FindResult { entities, total })
    }

    async fn read(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Option<StoredEntity>, StorageError> {
        Ok(self
            .tables
            .get(resource_type)
            .and_then(|table| table.get(id).map(|entry| entry.value().clone())))
    }

    async fn create(
        &self,
        resource_type: &str,
        owner_id: Option<&str>,
        change_set: &ChangeSet,
    ) -> Result<StoredEntity, StorageError> {
        let lock = self.write_lock(resource_type);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_unique(resource_type, change_set, None)?;

        let id = generate_id();
        let entity = StoredEntity::new(
            resource_type,
            id.clone(),
            owner_id.map(String::from),
            change_set,
        );

        let table = self.tables.entry(resource_type.to_string()).or_default();
        if table.contains_key(&id) {
            return Err(StorageError::conflict(format!(
                "entity {resource_type}/{id} already exists"
            )));
        }
        table.insert(id, entity.clone());

        tracing::debug!(resource_type, id = %entity.id, "entity created");
        Ok(entity)
    }

    async fn update(
        &self,
        resource_type: &str,
        id: &str,
        change_set: &ChangeSet,
    ) -> Result<StoredEntity, StorageError> {
        let lock = self.write_lock(resource_type);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.check_unique(resource_type, change_set, Some(id))?;

        let table = self
            .tables
            .get(resource_type)
            .ok_or_else(|| StorageError::not_found(resource_type, id))?;
        let mut entry = table
            .get_mut(id)
            .ok_or_else(|| StorageError::not_found(resource_type, id))?;

        entry.value_mut().apply(change_set);
        let updated = entry.value().clone();

        tracing::debug!(resource_type, id, "entity updated");
        Ok(updated)
    }

    async fn delete(&self, resource_type: &str, id: &str) -> Result<(), StorageError> {
        let removed = self
            .tables
            .get(resource_type)
            .and_then(|table| table.remove(id));
        match removed {
            Some(_) => {
                tracing::debug!(resource_type, id, "entity deleted");
                Ok(())
            }
            None => Err(StorageError::not_found(resource_type, id)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnstile_query::{FieldRule, FieldType, FilterOp, FilterSchema, PageRequest, PageLimits, UnknownParams};

    fn change_set(pairs: &[(&str, serde_json::Value)]) -> ChangeSet {
        let mut cs = ChangeSet::new();
        for (k, v) in pairs {
            cs.set(*k, v.clone());
        }
        cs
    }

    fn window(number: u32, size: u32) -> PageWindow {
        PageRequest::new(number)
            .with_size(size)
            .resolve(PageLimits::default())
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let store = MemoryEntityStore::new();
        let created = store
            .create("posts", Some("user-1"), &change_set(&[("title", json!("Hello"))]))
            .await
            .unwrap();

        let read = store.read("posts", &created.id).await.unwrap().unwrap();
        assert_eq!(read, created);
        assert_eq!(read.owner_id.as_deref(), Some("user-1"));

        assert!(store.read("posts", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = MemoryEntityStore::new();
        let err = store
            .update("posts", "nope", &change_set(&[("title", json!("x"))]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_advances_timestamp() {
        let store = MemoryEntityStore::new();
        let created = store
            .create("posts", None, &change_set(&[("title", json!("a"))]))
            .await
            .unwrap();

        let updated = store
            .update("posts", &created.id, &change_set(&[("title", json!("b"))]))
            .await
            .unwrap();

        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.get_field("title"), Some(&json!("b")));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryEntityStore::new();
        let created = store
            .create("posts", None, &change_set(&[("title", json!("a"))]))
            .await
            .unwrap();

        store.delete("posts", &created.id).await.unwrap();
        assert!(store.read("posts", &created.id).await.unwrap().is_none());
        assert!(store.delete("posts", &created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unique_field_enforced() {
        let store = MemoryEntityStore::new();
        store.declare_unique("users", "username");

        store
            .create("users", None, &change_set(&[("username", json!("alice"))]))
            .await
            .unwrap();

        let err = store
            .create("users", None, &change_set(&[("username", json!("alice"))]))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // A different value is fine.
        let bob = store
            .create("users", None, &change_set(&[("username", json!("bob"))]))
            .await
            .unwrap();

        // Updating an entity to keep its own value is not a conflict.
        store
            .update("users", &bob.id, &change_set(&[("username", json!("bob"))]))
            .await
            .unwrap();

        // Taking someone else's value is.
        let err = store
            .update("users", &bob.id, &change_set(&[("username", json!("alice"))]))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_admit_one_unique_value() {
        let store = Arc::new(MemoryEntityStore::new());
        store.declare_unique("users", "username");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .create("users", None, &change_set(&[("username", json!("alice"))]))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(err.is_conflict()),
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.count("users"), 1);
    }

    #[tokio::test]
    async fn test_find_filters_sorts_and_windows() {
        let store = MemoryEntityStore::new();
        for (title, views) in [("a", 30), ("b", 10), ("c", 20), ("d", 40)] {
            store
                .create(
                    "posts",
                    None,
                    &change_set(&[("title", json!(title)), ("views", json!(views))]),
                )
                .await
                .unwrap();
        }

        let schema = FilterSchema::new().field(
            "views",
            FieldRule::new(FieldType::Integer).allow(FilterOp::Gt),
        );
        let filter = schema
            .parse(
                &[("views:gt".to_string(), "10".to_string())],
                UnknownParams::Reject,
            )
            .unwrap();

        let result = store
            .find("posts", &filter, &Order::asc("views"), window(1, 2))
            .await
            .unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.len(), 2);
        assert_eq!(result.entities[0].get_field("title"), Some(&json!("c")));
        assert_eq!(result.entities[1].get_field("title"), Some(&json!("a")));

        let rest = store
            .find("posts", &filter, &Order::asc("views"), window(2, 2))
            .await
            .unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest.entities[0].get_field("title"), Some(&json!("d")));
    }

    #[tokio::test]
    async fn test_find_page_idempotent() {
        let store = MemoryEntityStore::new();
        for i in 0..7 {
            store
                .create("posts", None, &change_set(&[("n", json!(i))]))
                .await
                .unwrap();
        }

        let filter = FilterSpec::empty();
        let order = Order::asc("n");

        let first = store.find("posts", &filter, &order, window(2, 3)).await.unwrap();
        let second = store.find("posts", &filter, &order, window(2, 3)).await.unwrap();

        let ids = |r: &FindResult| r.entities.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_find_window_past_end_is_empty() {
        let store = MemoryEntityStore::new();
        store
            .create("posts", None, &change_set(&[("title", json!("only"))]))
            .await
            .unwrap();

        let result = store
            .find("posts", &FilterSpec::empty(), &Order::default(), window(50, 10))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total, 1);
    }

    #[tokio::test]
    async fn test_find_unknown_resource_type_is_empty() {
        let store = MemoryEntityStore::new();
        let result = store
            .find("ghosts", &FilterSpec::empty(), &Order::default(), window(1, 10))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total, 0);
    }
}
