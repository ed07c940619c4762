//! Storage data types: the stored-entity envelope and find results.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use turnstile_core::ChangeSet;

/// An entity as held by a storage backend.
///
/// Timestamps are generated by the store and never client-writable;
/// `updated_at` is monotonically non-decreasing across mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    /// The entity id.
    pub id: String,
    /// The resource type this entity belongs to (e.g. "users", "posts").
    pub resource_type: String,
    /// The identity that owns this entity, when ownership applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// The mutable field values as a JSON object.
    pub fields: Value,
    /// When the entity was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the entity was last mutated.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl StoredEntity {
    /// Creates a new entity from a validated change-set.
    #[must_use]
    pub fn new(
        resource_type: impl Into<String>,
        id: impl Into<String>,
        owner_id: Option<String>,
        change_set: &ChangeSet,
    ) -> Self {
        let now = turnstile_core::now_utc();
        let mut fields = Map::new();
        for (name, value) in change_set.iter() {
            fields.insert(name.to_string(), value.clone());
        }
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            owner_id,
            fields: Value::Object(fields),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a change-set, stamping `updated_at`.
    ///
    /// The new timestamp is `max(now, previous)` so it never regresses under
    /// clock skew.
    pub fn apply(&mut self, change_set: &ChangeSet) {
        if let Value::Object(fields) = &mut self.fields {
            for (name, value) in change_set.iter() {
                fields.insert(name.to_string(), value.clone());
            }
        }
        self.updated_at = turnstile_core::now_utc().max(self.updated_at);
    }

    /// Reads a field value.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The entity as a flat JSON document for filter evaluation: its fields
    /// plus the generated id and timestamps.
    #[must_use]
    pub fn filter_document(&self) -> Value {
        let mut doc = match &self.fields {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        };
        doc.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(owner) = &self.owner_id {
            doc.insert("owner_id".to_string(), Value::String(owner.clone()));
        }
        doc.insert(
            "created_at".to_string(),
            Value::String(turnstile_core::format_rfc3339(self.created_at)),
        );
        doc.insert(
            "updated_at".to_string(),
            Value::String(turnstile_core::format_rfc3339(self.updated_at)),
        );
        Value::Object(doc)
    }
}

/// Result of a `find` operation: one window of entities plus the total
/// matching count.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindResult {
    /// The entities inside the requested window, in stable order.
    pub entities: Vec<StoredEntity>,
    /// Total count of entities matching the filter, across all windows.
    pub total: usize,
}

impl FindResult {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Total ordering applied before pagination.
///
/// Ties are always broken by entity id so that concurrent inserts cannot
/// duplicate or skip rows across pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Field to sort by; `created_at`, `updated_at`, and `id` address the
    /// envelope, anything else addresses the entity's fields.
    pub field: String,
    /// Sort direction.
    pub descending: bool,
}

impl Order {
    #[must_use]
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    #[must_use]
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }

    /// Compares two entities under this order, id as tiebreak.
    #[must_use]
    pub fn compare(&self, a: &StoredEntity, b: &StoredEntity) -> Ordering {
        let primary = compare_values(&self.sort_key(a), &self.sort_key(b));
        let primary = if self.descending {
            primary.reverse()
        } else {
            primary
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    fn sort_key(&self, entity: &StoredEntity) -> Option<Value> {
        match self.field.as_str() {
            "id" => Some(Value::String(entity.id.clone())),
            "created_at" => Some(Value::String(turnstile_core::format_rfc3339(
                entity.created_at,
            ))),
            "updated_at" => Some(Value::String(turnstile_core::format_rfc3339(
                entity.updated_at,
            ))),
            field => entity.get_field(field).cloned(),
        }
    }
}

impl Default for Order {
    /// Creation order: ascending `created_at`, id tiebreak.
    fn default() -> Self {
        Self::asc("created_at")
    }
}

/// Compares JSON sort keys. Missing values sort first; mixed types fall back
/// to their text forms.
fn compare_values(a: &Option<Value>, b: &Option<Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a, b) {
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (a, b) => a.to_string().cmp(&b.to_string()),
        },
    }
}
