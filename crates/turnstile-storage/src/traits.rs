//! The storage collaborator contract.

use async_trait::async_trait;

use turnstile_core::ChangeSet;
use turnstile_query::{FilterSpec, PageWindow};

use crate::error::StorageError;
use crate::types::{FindResult, Order, StoredEntity};

/// The persistence collaborator the pipeline calls into.
///
/// Every argument arrives already validated: the filter passed allow-list
/// checks, the window was resolved and clamped by the paginator, and the
/// change-set passed field and cross-field validation. Implementations must
/// be thread-safe (`Send + Sync`) and must apply stable ordering in `find`
/// (ties broken by entity id).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Finds entities matching `filter`, ordered by `order`, returning the
    /// entities inside `window` together with the total matching count.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues; an empty window is
    /// not an error.
    async fn find(
        &self,
        resource_type: &str,
        filter: &FilterSpec,
        order: &Order,
        window: PageWindow,
    ) -> Result<FindResult, StorageError>;

    /// Reads a single entity by id. Returns `None` if it does not exist.
    async fn read(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Option<StoredEntity>, StorageError>;

    /// Creates a new entity from a validated change-set.
    ///
    /// The store generates the id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` when a declared unique field already
    /// holds one of the change-set's values.
    async fn create(
        &self,
        resource_type: &str,
        owner_id: Option<&str>,
        change_set: &ChangeSet,
    ) -> Result<StoredEntity, StorageError>;

    /// Applies a validated change-set to an existing entity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entity does not exist, and
    /// `StorageError::Conflict` on unique-field collisions.
    async fn update(
        &self,
        resource_type: &str,
        id: &str,
        change_set: &ChangeSet,
    ) -> Result<StoredEntity, StorageError>;

    /// Deletes an entity by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entity does not exist.
    async fn delete(&self, resource_type: &str, id: &str) -> Result<(), StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
