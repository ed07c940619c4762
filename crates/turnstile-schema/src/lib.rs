//! Serializer/Validator: bidirectional mapping between wire payloads and
//! internal entities.
//!
//! The read direction projects a stored entity into its wire representation,
//! emitting only fields marked exposable; internal-only fields (secret
//! hashes) never leave the store. The write direction turns an incoming
//! payload into a validated [`ChangeSet`](turnstile_core::ChangeSet),
//! accumulating every field failure rather than stopping at the first, and
//! hashing secret fields one-way before anything reaches persistence.

pub mod field;
pub mod schema;
pub mod secret;

pub use field::{FieldSpec, FieldValidator};
pub use schema::{CrossFieldRule, ResourceSchema, WriteMode};
pub use secret::{hash_secret, verify_secret};
