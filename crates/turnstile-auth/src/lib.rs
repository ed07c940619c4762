//! Authentication and authorization for the Turnstile request pipeline.
//!
//! Two stages, always evaluated in order: the credential resolver turns a
//! request's credential material into an [`Identity`] (or fails with
//! `Unauthenticated`), then the permission gate decides whether that identity
//! may perform the requested action (or fails with `Forbidden`). The gate is
//! default-deny: an action with no registered rule is never allowed.

pub mod gate;
pub mod identity;
pub mod resolver;

pub use gate::{AccessRule, PermissionGate, Target};
pub use identity::Identity;
pub use resolver::{Credential, CredentialResolver, MemoryIdentityStore};
