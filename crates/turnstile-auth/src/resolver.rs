//! Credential Resolver: extracts a caller's identity from credential
//! material.
//!
//! Resolution never mutates state. A missing, malformed, expired, or unknown
//! credential fails with `Unauthenticated`; whether an endpoint tolerates an
//! absent credential is the permission gate's decision, not the resolver's.

use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

use turnstile_core::{PipelineError, Result};

use crate::identity::Identity;

/// Credential material carried by a normalized request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// No credential supplied.
    None,
    /// A session identifier (cookie-style).
    Session(String),
    /// A bearer token (Authorization-header-style).
    Bearer(String),
}

impl Credential {
    /// The opaque token inside the credential, if one is present.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Session(token) | Self::Bearer(token) => Some(token),
        }
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Resolves credential material into an [`Identity`].
///
/// Implementations must be deterministic within a credential's validity
/// window: repeated calls with the same valid credential yield the same
/// identity.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Resolves a credential, failing with `Unauthenticated` when no valid
    /// identity can be derived from it.
    async fn resolve(&self, credential: &Credential) -> Result<Identity>;
}

/// In-memory identity store mapping opaque tokens to identities.
///
/// The bundled implementation of the identity-store collaborator, used by
/// tests and embedding applications that manage sessions themselves. Tokens
/// may carry an expiry; expired tokens resolve exactly like unknown ones.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    tokens: DashMap<String, TokenEntry>,
}

#[derive(Debug, Clone)]
struct TokenEntry {
    identity: Identity,
    expires_at: Option<OffsetDateTime>,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token that never expires.
    pub fn register_token(&self, token: impl Into<String>, identity: Identity) {
        self.tokens.insert(
            token.into(),
            TokenEntry {
                identity,
                expires_at: None,
            },
        );
    }

    /// Registers a token valid until the given instant.
    pub fn register_token_with_expiry(
        &self,
        token: impl Into<String>,
        identity: Identity,
        expires_at: OffsetDateTime,
    ) {
        self.tokens.insert(
            token.into(),
            TokenEntry {
                identity,
                expires_at: Some(expires_at),
            },
        );
    }

    /// Removes a token (logout / revocation).
    pub fn revoke_token(&self, token: &str) {
        self.tokens.remove(token);
    }
}

#[async_trait]
impl CredentialResolver for MemoryIdentityStore {
    async fn resolve(&self, credential: &Credential) -> Result<Identity> {
        let Some(token) = credential.token() else {
            return Err(PipelineError::Unauthenticated);
        };

        let Some(entry) = self.tokens.get(token) else {
            tracing::debug!("credential does not match any registered token");
            return Err(PipelineError::Unauthenticated);
        };

        if let Some(expires_at) = entry.expires_at
            && turnstile_core::now_utc() >= expires_at
        {
            tracing::debug!(identity = %entry.identity.id, "credential expired");
            return Err(PipelineError::Unauthenticated);
        }

        if !entry.identity.enabled {
            tracing::debug!(identity = %entry.identity.id, "identity is disabled");
            return Err(PipelineError::Unauthenticated);
        }

        Ok(entry.identity.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    #[tokio::test]
    async fn test_missing_credential_is_unauthenticated() {
        let store = MemoryIdentityStore::new();
        let err = store.resolve(&Credential::None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthenticated() {
        let store = MemoryIdentityStore::new();
        let err = store
            .resolve(&Credential::Bearer("nope".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_valid_token_resolves_deterministically() {
        let store = MemoryIdentityStore::new();
        store.register_token("tok-1", Identity::new("user-1").with_role("editor"));

        let credential = Credential::Session("tok-1".to_string());
        let first = store.resolve(&credential).await.unwrap();
        let second = store.resolve(&credential).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.id, "user-1");
        assert!(first.has_role("editor"));
    }

    #[tokio::test]
    async fn test_expired_token_is_unauthenticated() {
        let store = MemoryIdentityStore::new();
        store.register_token_with_expiry(
            "tok-old",
            Identity::new("user-1"),
            turnstile_core::now_utc() - Duration::seconds(1),
        );

        let err = store
            .resolve(&Credential::Bearer("tok-old".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_disabled_identity_is_unauthenticated() {
        let store = MemoryIdentityStore::new();
        store.register_token("tok-2", Identity::new("user-2").disabled());

        let err = store
            .resolve(&Credential::Bearer("tok-2".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_revoked_token_stops_resolving() {
        let store = MemoryIdentityStore::new();
        store.register_token("tok-3", Identity::new("user-3"));
        let credential = Credential::Bearer("tok-3".to_string());

        assert!(store.resolve(&credential).await.is_ok());
        store.revoke_token("tok-3");
        assert!(store.resolve(&credential).await.is_err());
    }
}
