//! Pipeline configuration.
//!
//! One immutable value passed explicitly into the pipeline at construction
//! time. Components never reach for ambient or global settings.

use serde::{Deserialize, Serialize};

use turnstile_cache::CacheConfig;
use turnstile_query::{PageLimits, UnknownParams};

/// Immutable configuration for a [`Pipeline`](crate::Pipeline).
///
/// Serde-derived so embedding applications can load it from their own
/// configuration files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Page size bounds applied by the paginator.
    #[serde(default)]
    pub page: PageLimits,

    /// Read-cache sizing and time-to-live.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Treatment of query parameters outside a resource's allow-list.
    #[serde(default)]
    pub unknown_params: UnknownParams,
}
