//! Per-resource schemas: wire projection and change-set construction.

use serde_json::{Map, Value};

use turnstile_core::{ChangeSet, PipelineError, Result, ValidationErrors};
use turnstile_storage::StoredEntity;

use crate::field::FieldSpec;
use crate::secret::hash_secret;

/// Whether a payload creates a new entity or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Required fields must be present.
    Create,
    /// Partial payloads are acceptable.
    Update,
}

/// A validation rule spanning more than one field. Runs after per-field
/// validation; failures accumulate alongside field errors.
#[derive(Debug, Clone)]
pub enum CrossFieldRule {
    /// `confirmation` must equal `field` (e.g. password confirmation).
    /// Checked whenever `field` is present in the payload.
    MustMatch {
        field: String,
        confirmation: String,
    },
}

impl CrossFieldRule {
    fn check(&self, payload: &Map<String, Value>, errors: &mut ValidationErrors) {
        match self {
            Self::MustMatch {
                field,
                confirmation,
            } => {
                if payload.contains_key(field) && payload.get(field) != payload.get(confirmation) {
                    errors.add(confirmation, format!("must match {field}"));
                }
            }
        }
    }
}

/// The serializer/validator for one resource type.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    resource_type: String,
    fields: Vec<FieldSpec>,
    cross_rules: Vec<CrossFieldRule>,
}

impl ResourceSchema {
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            fields: Vec::new(),
            cross_rules: Vec::new(),
        }
    }

    /// Declares a field, in wire order.
    #[must_use]
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Adds a cross-field rule.
    #[must_use]
    pub fn cross_rule(mut self, rule: CrossFieldRule) -> Self {
        self.cross_rules.push(rule);
        self
    }

    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Read direction: projects a stored entity into its wire shape.
    ///
    /// Emits the generated envelope (id, owner, timestamps) plus exposed
    /// fields in declaration order. Internal-only and secret fields are
    /// omitted entirely, not nulled.
    #[must_use]
    pub fn serialize(&self, entity: &StoredEntity) -> Value {
        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(entity.id.clone()));
        if let Some(owner) = &entity.owner_id {
            out.insert("owner_id".to_string(), Value::String(owner.clone()));
        }
        for spec in &self.fields {
            if !spec.is_exposed() {
                continue;
            }
            if let Some(value) = entity.get_field(spec.name()) {
                out.insert(spec.name().to_string(), value.clone());
            }
        }
        out.insert(
            "created_at".to_string(),
            Value::String(turnstile_core::format_rfc3339(entity.created_at)),
        );
        out.insert(
            "updated_at".to_string(),
            Value::String(turnstile_core::format_rfc3339(entity.updated_at)),
        );
        Value::Object(out)
    }

    /// Write direction: validates a payload into a [`ChangeSet`].
    ///
    /// Validation does not short-circuit: every unknown field, non-writable
    /// field, type mismatch, failed validator, missing required field, and
    /// violated cross-field rule is collected into one `Validation` error.
    /// Secret fields are hashed after validation passes; the raw value never
    /// leaves this function.
    pub fn build_change_set(&self, payload: &Value, mode: WriteMode) -> Result<ChangeSet> {
        let Value::Object(payload) = payload else {
            let mut errors = ValidationErrors::new();
            errors.add("_payload", "must be a JSON object");
            return Err(errors.into());
        };

        let mut errors = ValidationErrors::new();

        for (name, value) in payload {
            match self.spec(name) {
                None => errors.add(name, "unknown field"),
                Some(spec) if !spec.writable => errors.add(name, "is not writable"),
                Some(spec) => spec.check_value(value, &mut errors),
            }
        }

        if mode == WriteMode::Create {
            for spec in &self.fields {
                if spec.required_on_create && !payload.contains_key(spec.name()) {
                    errors.add(spec.name(), "is required");
                }
            }
        }

        for rule in &self.cross_rules {
            rule.check(payload, &mut errors);
        }

        errors.into_result()?;

        let mut change_set = ChangeSet::new();
        for spec in &self.fields {
            if !spec.writable || !spec.persisted {
                continue;
            }
            let Some(value) = payload.get(spec.name()) else {
                continue;
            };
            if spec.secret {
                // check_value guaranteed a string above.
                let raw = value.as_str().unwrap_or_default();
                change_set.set(spec.name(), Value::String(hash_secret(raw)?));
            } else {
                change_set.set(spec.name(), value.clone());
            }
        }
        Ok(change_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldValidator;
    use crate::secret::verify_secret;
    use serde_json::json;

    fn user_schema() -> ResourceSchema {
        ResourceSchema::new("users")
            .field(
                FieldSpec::string("username")
                    .required()
                    .validate(FieldValidator::MinLength(3)),
            )
            .field(FieldSpec::string("email").required())
            .field(
                FieldSpec::secret("password")
                    .required()
                    .validate(FieldValidator::MinLength(8)),
            )
            .field(FieldSpec::secret("password_confirm").ephemeral())
            .field(FieldSpec::integer("login_count").read_only())
            .cross_rule(CrossFieldRule::MustMatch {
                field: "password".to_string(),
                confirmation: "password_confirm".to_string(),
            })
    }

    #[test]
    fn test_create_happy_path_hashes_secret() {
        let payload = json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "hunter2hunter2",
            "password_confirm": "hunter2hunter2",
        });
        let changes = user_schema()
            .build_change_set(&payload, WriteMode::Create)
            .unwrap();

        // Ephemeral confirmation never persisted.
        assert!(!changes.contains("password_confirm"));
        // Read-only field untouched.
        assert!(!changes.contains("login_count"));

        let hash = changes.get("password").unwrap().as_str().unwrap();
        assert_ne!(hash, "hunter2hunter2");
        assert!(verify_secret("hunter2hunter2", hash));
    }

    #[test]
    fn test_validation_accumulates_independent_failures() {
        // Two independent violations: short username and short password.
        let payload = json!({
            "username": "al",
            "email": "al@example.com",
            "password": "short",
            "password_confirm": "short",
        });
        let err = user_schema()
            .build_change_set(&payload, WriteMode::Create)
            .unwrap_err();

        let PipelineError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("username").is_some());
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn test_missing_required_fields_on_create() {
        let err = user_schema()
            .build_change_set(&json!({}), WriteMode::Create)
            .unwrap_err();

        let PipelineError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("username"), Some(&["is required".to_string()][..]));
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    #[test]
    fn test_update_allows_partial_payload() {
        let changes = user_schema()
            .build_change_set(&json!({"email": "new@example.com"}), WriteMode::Update)
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes.get("email"), Some(&json!("new@example.com")));
    }

    #[test]
    fn test_unknown_and_read_only_fields_rejected() {
        let payload = json!({
            "email": "a@example.com",
            "login_count": 7,
            "is_admin": true,
        });
        let err = user_schema()
            .build_change_set(&payload, WriteMode::Update)
            .unwrap_err();

        let PipelineError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("login_count"), Some(&["is not writable".to_string()][..]));
        assert_eq!(errors.get("is_admin"), Some(&["unknown field".to_string()][..]));
        // The valid field alone is not an error.
        assert!(errors.get("email").is_none());
    }

    #[test]
    fn test_cross_field_mismatch() {
        let payload = json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "hunter2hunter2",
            "password_confirm": "different",
        });
        let err = user_schema()
            .build_change_set(&payload, WriteMode::Create)
            .unwrap_err();

        let PipelineError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("password_confirm"),
            Some(&["must match password".to_string()][..])
        );
    }

    #[test]
    fn test_non_object_payload() {
        let err = user_schema()
            .build_change_set(&json!([1, 2, 3]), WriteMode::Create)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_serialize_excludes_secrets() {
        let payload = json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "hunter2hunter2",
            "password_confirm": "hunter2hunter2",
        });
        let schema = user_schema();
        let changes = schema.build_change_set(&payload, WriteMode::Create).unwrap();
        let entity = turnstile_storage::StoredEntity::new("users", "u-1", None, &changes);

        let wire = schema.serialize(&entity);
        assert_eq!(wire["id"], json!("u-1"));
        assert_eq!(wire["username"], json!("alice"));
        assert!(wire.get("password").is_none());
        assert!(wire.get("password_confirm").is_none());
        assert!(wire.get("created_at").is_some());
        assert!(wire.get("updated_at").is_some());
    }
}
