//! Error kinds shared by every stage of the request pipeline.
//!
//! Each component fails fast with one of these kinds; the orchestrator never
//! reinterprets an error, it only maps it to a response status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accumulated field-level validation failures.
///
/// Validation never short-circuits on the first bad field: every offending
/// field ends up in this map with one message per violated rule. Uses a
/// `BTreeMap` so error output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    /// Absorbs all failures from another accumulator.
    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, mut messages) in other.errors {
            self.errors.entry(field).or_default().append(&mut messages);
        }
    }

    /// Returns the messages recorded for a field, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    /// Returns the names of all offending fields, in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of offending fields (not messages).
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Converts into the map used in structured 400 response bodies.
    #[must_use]
    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.errors
    }

    /// Returns `Ok(())` if empty, otherwise a `Validation` error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(self))
        }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Errors produced by the request pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No valid identity could be resolved from the request's credentials.
    #[error("Authentication required")]
    Unauthenticated,

    /// The identity is known but lacks rights for the requested action.
    #[error("Access denied: {action} on {resource}")]
    Forbidden { resource: String, action: String },

    /// A filter parameter failed allow-list, operator, or coercion checks.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// The requested page number or size is not acceptable.
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// One or more payload fields failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The target entity does not exist.
    #[error("Resource not found: {resource_type}/{id}")]
    NotFound { resource_type: String, id: String },

    /// The mutation collides with existing state (duplicate id or unique field).
    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    /// Collaborator failure. Logged with full context, surfaced without detail.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Creates a new `Forbidden` error.
    #[must_use]
    pub fn forbidden(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self::Forbidden {
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Creates a new `InvalidFilter` error.
    #[must_use]
    pub fn invalid_filter(message: impl Into<String>) -> Self {
        Self::InvalidFilter(message.into())
    }

    /// Creates a new `InvalidPagination` error.
    #[must_use]
    pub fn invalid_pagination(message: impl Into<String>) -> Self {
        Self::InvalidPagination(message.into())
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The HTTP status code this error maps to at the transport boundary.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated => 401,
            Self::Forbidden { .. } => 403,
            Self::InvalidFilter(_) | Self::InvalidPagination(_) | Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
        }
    }

    /// Check if this error is a client error (4xx category)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }

    /// Check if this error is a server error (5xx category)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }

    /// Get error kind for logging/monitoring
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::InvalidFilter(_) => ErrorKind::InvalidFilter,
            Self::InvalidPagination(_) => ErrorKind::InvalidPagination,
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}

impl From<ValidationErrors> for PipelineError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Error kinds for logging and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    InvalidFilter,
    InvalidPagination,
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Forbidden => write!(f, "forbidden"),
            Self::InvalidFilter => write!(f, "invalid_filter"),
            Self::InvalidPagination => write!(f, "invalid_pagination"),
            Self::Validation => write!(f, "validation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Convenience result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
