//! Persistence collaborator contract for the Turnstile request pipeline.
//!
//! The pipeline treats the store as an already-validated, single-call
//! collaborator: it hands over a validated filter, a resolved page window,
//! or a validated change-set, and receives entities or a typed error back.
//! This crate defines that contract ([`EntityStore`]), the stored-entity
//! envelope, and a concurrent in-memory reference backend.

pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use error::StorageError;
pub use memory::MemoryEntityStore;
pub use traits::EntityStore;
pub use types::{FindResult, Order, StoredEntity};
