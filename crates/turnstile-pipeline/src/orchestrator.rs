//! The pipeline itself: fixed stage order with strict short-circuiting.
//!
//! A request moves through authentication, the pre-dispatch permission
//! check, handler lookup, and the handler body, in that order. The first
//! stage that fails ends the request with its own error kind; nothing after
//! it runs, so a failed permission check can never leak whether the target
//! entity exists.

use std::sync::Arc;

use turnstile_auth::{Credential, CredentialResolver, Identity, PermissionGate, Target};
use turnstile_cache::{CacheStats, ReadCache};
use turnstile_core::{PipelineError, Result};
use turnstile_storage::EntityStore;

use crate::config::PipelineConfig;
use crate::registry::{HandlerContext, ResourceRegistry};
use crate::request::{Request, Response};

/// The assembled request pipeline.
///
/// Built once at startup from its collaborators and an immutable
/// [`PipelineConfig`]; `execute` is the only entry point and takes `&self`,
/// so one pipeline serves concurrent requests.
pub struct Pipeline {
    config: PipelineConfig,
    resolver: Arc<dyn CredentialResolver>,
    gate: PermissionGate,
    registry: ResourceRegistry,
    store: Arc<dyn EntityStore>,
    cache: ReadCache,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        config: PipelineConfig,
        resolver: Arc<dyn CredentialResolver>,
        gate: PermissionGate,
        registry: ResourceRegistry,
        store: Arc<dyn EntityStore>,
    ) -> Self {
        let cache = ReadCache::new(config.cache);
        Self {
            config,
            resolver,
            gate,
            registry,
            store,
            cache,
        }
    }

    /// Runs one request through the full stage sequence.
    #[tracing::instrument(
        name = "pipeline_execute",
        level = "debug",
        skip_all,
        fields(resource = %request.resource, action = %request.action)
    )]
    pub async fn execute(&self, request: &Request) -> Result<Response> {
        let outcome = self.run_stages(request).await;
        match &outcome {
            Ok(response) => {
                tracing::debug!(status = response.status.code(), "request completed");
            }
            Err(err) if err.is_server_error() => {
                tracing::error!(kind = %err.kind(), error = %err, "request failed");
            }
            Err(err) => {
                tracing::debug!(kind = %err.kind(), "request rejected");
            }
        }
        outcome
    }

    async fn run_stages(&self, request: &Request) -> Result<Response> {
        let identity = self.authenticate(request).await?;

        // Pre-dispatch check with no target entity in scope. Handlers for
        // single-entity actions re-check once the target's owner is known.
        self.gate.check(
            identity.as_ref(),
            &request.resource,
            request.action,
            Target::None,
        )?;

        let Some((handler, definition)) = self.registry.lookup(&request.resource, request.action)
        else {
            tracing::debug!("no handler registered");
            return Err(PipelineError::not_found(
                &request.resource,
                request.id.as_deref().unwrap_or("*"),
            ));
        };

        let ctx = HandlerContext {
            definition,
            store: self.store.as_ref(),
            cache: &self.cache,
            gate: &self.gate,
            config: &self.config,
        };
        handler.handle(ctx, request, identity.as_ref()).await
    }

    /// Resolves the request's credential into an identity.
    ///
    /// Anonymous access is only tolerated when the gate explicitly allows it
    /// for this `(resource, action)` pair. A credential that is present is
    /// always resolved, even on anonymous endpoints: presenting an invalid
    /// credential fails the request rather than silently downgrading it.
    async fn authenticate(&self, request: &Request) -> Result<Option<Identity>> {
        match &request.credential {
            Credential::None
                if self
                    .gate
                    .allows_anonymous(&request.resource, request.action) =>
            {
                Ok(None)
            }
            credential => self.resolver.resolve(credential).await.map(Some),
        }
    }

    /// Read-cache counters, for monitoring.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// The configuration the pipeline was built with.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
