//! The resolved representation of a caller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An authenticated principal, reconstructed per request from a credential.
///
/// The pipeline never persists identities; they are owned by the external
/// identity store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique principal id.
    pub id: String,

    /// Assigned role names.
    pub roles: Vec<String>,

    /// Disabled identities never authenticate.
    pub enabled: bool,

    /// Additional attributes for policy evaluation.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, serde_json::Value>,
}

impl Identity {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roles: Vec::new(),
            enabled: true,
            attributes: HashMap::new(),
        }
    }

    /// Builder-style role assignment.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Builder-style disable, for representing deactivated accounts.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Returns `true` if the identity has a specific role.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Returns `true` if the identity has any of the specified roles.
    #[must_use]
    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.has_role(role))
    }

    /// Gets an attribute value by key.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}
