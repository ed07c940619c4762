//! Explicit dispatch: a lookup table from `(resource, action)` to handler.
//!
//! Every routable operation is registered here at construction time. There
//! is deliberately no method-name, verb, or reflection-based resolution; an
//! unregistered pair simply does not exist as far as the pipeline is
//! concerned.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use turnstile_auth::{Identity, PermissionGate};
use turnstile_cache::ReadCache;
use turnstile_core::{Action, Result};
use turnstile_query::FilterSchema;
use turnstile_schema::ResourceSchema;
use turnstile_storage::{EntityStore, Order};

use crate::config::PipelineConfig;
use crate::handlers;
use crate::request::{Request, Response};

/// Everything the pipeline knows about one resource type.
#[derive(Debug, Clone)]
pub struct ResourceDefinition {
    /// Serializer/validator for the resource's payloads.
    pub schema: ResourceSchema,
    /// Allow-list of filterable fields.
    pub filters: FilterSchema,
    /// Stable ordering applied to list reads.
    pub order: Order,
}

impl ResourceDefinition {
    #[must_use]
    pub fn new(schema: ResourceSchema, filters: FilterSchema) -> Self {
        Self {
            schema,
            filters,
            order: Order::default(),
        }
    }

    /// Overrides the list ordering.
    #[must_use]
    pub fn with_order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }
}

/// Borrowed collaborators a handler works with.
pub struct HandlerContext<'a> {
    pub definition: &'a ResourceDefinition,
    pub store: &'a dyn EntityStore,
    pub cache: &'a ReadCache,
    pub gate: &'a PermissionGate,
    pub config: &'a PipelineConfig,
}

/// One registered operation.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Runs the operation. Called only after credential resolution and the
    /// pre-dispatch permission check have passed.
    async fn handle(
        &self,
        ctx: HandlerContext<'_>,
        request: &Request,
        identity: Option<&Identity>,
    ) -> Result<Response>;
}

/// The `(resource, action)` → handler lookup table.
#[derive(Default)]
pub struct ResourceRegistry {
    definitions: HashMap<String, Arc<ResourceDefinition>>,
    handlers: HashMap<(String, Action), Arc<dyn Handler>>,
}

impl ResourceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resource definition together with one handler per action.
    ///
    /// The standard CRUD surface; use [`register`](Self::register) for
    /// bespoke operations or a partial surface.
    #[must_use]
    pub fn register_crud(mut self, resource: impl Into<String>, definition: ResourceDefinition) -> Self {
        let resource = resource.into();
        self.definitions
            .insert(resource.clone(), Arc::new(definition));
        for (action, handler) in [
            (Action::List, Arc::new(handlers::ListHandler) as Arc<dyn Handler>),
            (Action::Read, Arc::new(handlers::ReadHandler)),
            (Action::Create, Arc::new(handlers::CreateHandler)),
            (Action::Update, Arc::new(handlers::UpdateHandler)),
            (Action::Delete, Arc::new(handlers::DeleteHandler)),
        ] {
            self.handlers.insert((resource.clone(), action), handler);
        }
        self
    }

    /// Registers a single handler for a `(resource, action)` pair. The
    /// resource's definition must be registered as well, once.
    #[must_use]
    pub fn register(
        mut self,
        resource: impl Into<String>,
        action: Action,
        handler: Arc<dyn Handler>,
    ) -> Self {
        self.handlers.insert((resource.into(), action), handler);
        self
    }

    /// Registers a resource definition without handlers.
    #[must_use]
    pub fn define(mut self, resource: impl Into<String>, definition: ResourceDefinition) -> Self {
        self.definitions
            .insert(resource.into(), Arc::new(definition));
        self
    }

    /// Looks up the handler and definition for a pair, if registered.
    #[must_use]
    pub fn lookup(
        &self,
        resource: &str,
        action: Action,
    ) -> Option<(&Arc<dyn Handler>, &Arc<ResourceDefinition>)> {
        let handler = self.handlers.get(&(resource.to_string(), action))?;
        let definition = self.definitions.get(resource)?;
        Some((handler, definition))
    }

    /// Returns `true` if any action is registered for the resource.
    #[must_use]
    pub fn knows_resource(&self, resource: &str) -> bool {
        self.definitions.contains_key(resource)
    }
}
