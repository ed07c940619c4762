//! Normalized request and response shapes at the transport boundary.
//!
//! The transport adapter (HTTP framework, test harness, message bus) builds
//! a [`Request`] from whatever it receives and maps the pipeline's outcome
//! back: a [`Response`] on success, or a `PipelineError` whose
//! `status_code()` and [`error_body`] give the wire mapping.

use serde_json::{Value, json};

use turnstile_auth::Credential;
use turnstile_core::{Action, PipelineError};

/// A normalized request handed to the pipeline.
#[derive(Debug, Clone)]
pub struct Request {
    /// Resource type addressed, e.g. "users" or "posts".
    pub resource: String,
    /// The action performed.
    pub action: Action,
    /// Target entity id, for single-entity actions.
    pub id: Option<String>,
    /// Raw query parameters in arrival order.
    pub query: Vec<(String, String)>,
    /// Request body, for write actions.
    pub body: Option<Value>,
    /// Credential material extracted by the transport.
    pub credential: Credential,
}

impl Request {
    /// A list request for a resource type.
    #[must_use]
    pub fn list(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: Action::List,
            id: None,
            query: Vec::new(),
            body: None,
            credential: Credential::None,
        }
    }

    /// A single-entity read request.
    #[must_use]
    pub fn read(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: Action::Read,
            id: Some(id.into()),
            query: Vec::new(),
            body: None,
            credential: Credential::None,
        }
    }

    /// A create request with a payload.
    #[must_use]
    pub fn create(resource: impl Into<String>, body: Value) -> Self {
        Self {
            resource: resource.into(),
            action: Action::Create,
            id: None,
            query: Vec::new(),
            body: Some(body),
            credential: Credential::None,
        }
    }

    /// An update request with a payload.
    #[must_use]
    pub fn update(resource: impl Into<String>, id: impl Into<String>, body: Value) -> Self {
        Self {
            resource: resource.into(),
            action: Action::Update,
            id: Some(id.into()),
            query: Vec::new(),
            body: Some(body),
            credential: Credential::None,
        }
    }

    /// A delete request.
    #[must_use]
    pub fn delete(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: Action::Delete,
            id: Some(id.into()),
            query: Vec::new(),
            body: None,
            credential: Credential::None,
        }
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Attaches credential material.
    #[must_use]
    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = credential;
        self
    }
}

/// Success status categories a pipeline run can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Read or mutation completed against existing state (HTTP 200).
    Ok,
    /// A new entity was created (HTTP 201).
    Created,
}

impl ResponseStatus {
    /// The HTTP status code this category maps to.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
        }
    }
}

/// A normalized successful response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: ResponseStatus,
    pub body: Value,
}

impl Response {
    #[must_use]
    pub fn ok(body: Value) -> Self {
        Self {
            status: ResponseStatus::Ok,
            body,
        }
    }

    #[must_use]
    pub fn created(body: Value) -> Self {
        Self {
            status: ResponseStatus::Created,
            body,
        }
    }
}

/// The structured error body a transport adapter should emit for a failed
/// request.
///
/// Validation failures carry the full field → messages map; internal errors
/// carry no detail beyond their kind.
#[must_use]
pub fn error_body(err: &PipelineError) -> Value {
    match err {
        PipelineError::Validation(errors) => json!({
            "error": err.kind().to_string(),
            "fields": errors.clone().into_map(),
        }),
        PipelineError::Internal { .. } => json!({
            "error": err.kind().to_string(),
            "message": "internal error",
        }),
        other => json!({
            "error": other.kind().to_string(),
            "message": other.to_string(),
        }),
    }
}
