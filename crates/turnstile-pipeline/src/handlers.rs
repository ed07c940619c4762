//! Built-in CRUD handlers.
//!
//! The read path is cache-aside: validate the filter and page first (both
//! cheap), derive the cache key from the validated query shape, and only on
//! miss run the store query and populate the cache. The write path validates
//! the payload into a change-set before persistence is touched; a request
//! that fails validation or an ownership check never starts a mutation.

use async_trait::async_trait;
use serde_json::{Value, json};

use turnstile_auth::{Identity, Target};
use turnstile_cache::CacheKey;
use turnstile_core::{PipelineError, Result};
use turnstile_query::{Page, PageRequest};
use turnstile_schema::WriteMode;
use turnstile_storage::StoredEntity;

use crate::registry::{Handler, HandlerContext};
use crate::request::{Request, Response};

/// Paginated, filtered list read with cache-aside short-circuiting.
pub struct ListHandler;

#[async_trait]
impl Handler for ListHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        request: &Request,
        _identity: Option<&Identity>,
    ) -> Result<Response> {
        let window = PageRequest::from_query(&request.query)?.resolve(ctx.config.page)?;
        let filter = ctx
            .definition
            .filters
            .parse(&request.query, ctx.config.unknown_params)?;

        let key = CacheKey::new(
            request.resource.clone(),
            filter.canonical_key(),
            window.number,
            window.limit as u32,
        );
        if let Some(cached) = ctx.cache.get(&key) {
            tracing::debug!(resource = %request.resource, "list served from cache");
            return Ok(Response::ok((*cached).clone()));
        }

        let found = ctx
            .store
            .find(&request.resource, &filter, &ctx.definition.order, window)
            .await?;

        let total = found.total;
        let items: Vec<Value> = found
            .entities
            .iter()
            .map(|entity| ctx.definition.schema.serialize(entity))
            .collect();
        let page = Page::new(items, window, total);
        let body = json!({
            "items": page.items,
            "page": page.number,
            "per_page": page.size,
            "total": page.total,
            "has_more": page.has_more,
        });

        ctx.cache.insert(key, body.clone());
        Ok(Response::ok(body))
    }
}

/// Single-entity read.
pub struct ReadHandler;

#[async_trait]
impl Handler for ReadHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        request: &Request,
        identity: Option<&Identity>,
    ) -> Result<Response> {
        let entity = load_target(&ctx, request).await?;
        ctx.gate.check(
            identity,
            &request.resource,
            request.action,
            Target::Entity(entity.owner_id.as_deref()),
        )?;
        Ok(Response::ok(ctx.definition.schema.serialize(&entity)))
    }
}

/// Entity creation. The caller becomes the owner.
pub struct CreateHandler;

#[async_trait]
impl Handler for CreateHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        request: &Request,
        identity: Option<&Identity>,
    ) -> Result<Response> {
        let payload = request.body.clone().unwrap_or(Value::Null);
        let change_set = ctx
            .definition
            .schema
            .build_change_set(&payload, WriteMode::Create)?;

        let owner = identity.map(|i| i.id.as_str());
        let entity = ctx
            .store
            .create(&request.resource, owner, &change_set)
            .await?;

        tracing::info!(resource = %request.resource, id = %entity.id, "entity created");
        Ok(Response::created(ctx.definition.schema.serialize(&entity)))
    }
}

/// Entity update, gated on ownership.
pub struct UpdateHandler;

#[async_trait]
impl Handler for UpdateHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        request: &Request,
        identity: Option<&Identity>,
    ) -> Result<Response> {
        let existing = load_target(&ctx, request).await?;
        // Ownership is checked before the payload is even validated, so a
        // non-owner learns nothing about the resource's validation rules.
        ctx.gate.check(
            identity,
            &request.resource,
            request.action,
            Target::Entity(existing.owner_id.as_deref()),
        )?;

        let payload = request.body.clone().unwrap_or(Value::Null);
        let change_set = ctx
            .definition
            .schema
            .build_change_set(&payload, WriteMode::Update)?;

        let entity = ctx
            .store
            .update(&request.resource, &existing.id, &change_set)
            .await?;

        tracing::info!(resource = %request.resource, id = %entity.id, "entity updated");
        Ok(Response::ok(ctx.definition.schema.serialize(&entity)))
    }
}

/// Entity deletion, gated on ownership.
pub struct DeleteHandler;

#[async_trait]
impl Handler for DeleteHandler {
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        request: &Request,
        identity: Option<&Identity>,
    ) -> Result<Response> {
        let existing = load_target(&ctx, request).await?;
        ctx.gate.check(
            identity,
            &request.resource,
            request.action,
            Target::Entity(existing.owner_id.as_deref()),
        )?;

        ctx.store.delete(&request.resource, &existing.id).await?;

        tracing::info!(resource = %request.resource, id = %existing.id, "entity deleted");
        Ok(Response::ok(Value::Null))
    }
}

/// Loads the entity a single-entity request addresses.
async fn load_target(ctx: &HandlerContext<'_>, request: &Request) -> Result<StoredEntity> {
    let id = request.id.as_deref().ok_or_else(|| {
        PipelineError::internal("single-entity action dispatched without an id")
    })?;
    ctx.store
        .read(&request.resource, id)
        .await?
        .ok_or_else(|| PipelineError::not_found(&request.resource, id))
}
