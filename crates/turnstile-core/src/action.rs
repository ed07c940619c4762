use serde::{Deserialize, Serialize};

/// The action a request performs against a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// List entities of a resource type (filterable, paginated).
    List,
    /// Read a single entity by id.
    Read,
    /// Create a new entity.
    Create,
    /// Update an existing entity.
    Update,
    /// Delete an existing entity.
    Delete,
}

impl Action {
    /// Returns `true` for actions that only read entity data.
    #[must_use]
    pub fn is_read(&self) -> bool {
        matches!(self, Self::List | Self::Read)
    }

    /// Returns `true` for actions that mutate entity data.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !self.is_read()
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Read => write!(f, "read"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}
