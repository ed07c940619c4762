//! Pipeline Orchestrator: one request lifecycle over pluggable stages.
//!
//! Composes credential resolution, permission checks, filter validation,
//! pagination, cache-aside reads, and payload validation into the state
//! machine
//!
//! ```text
//! Unauthenticated -> Authenticated -> Authorized -> Processing -> Completed
//!                                                              \-> Failed
//! ```
//!
//! with strict short-circuiting: the first failing stage's error kind is the
//! request's outcome and no later stage runs. Dispatch is an explicit lookup
//! table from `(resource, action)` to a registered handler; there is no
//! implicit method-name or reflection-based routing.

pub mod config;
pub mod handlers;
pub mod orchestrator;
pub mod registry;
pub mod request;

pub use config::PipelineConfig;
pub use orchestrator::Pipeline;
pub use registry::{Handler, HandlerContext, ResourceDefinition, ResourceRegistry};
pub use request::{Request, Response, ResponseStatus, error_body};
