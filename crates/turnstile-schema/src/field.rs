//! Field specifications: type, writability, exposure, and per-field
//! validation rules.

use regex::Regex;
use serde_json::Value;

use turnstile_core::ValidationErrors;
use turnstile_query::FieldType;

/// A semantic validation rule applied to one field's value.
#[derive(Debug, Clone)]
pub enum FieldValidator {
    /// Minimum string length in characters.
    MinLength(usize),
    /// Maximum string length in characters.
    MaxLength(usize),
    /// Value must match the regular expression.
    Pattern(Regex),
    /// Value must be one of the listed strings.
    OneOf(Vec<String>),
}

impl FieldValidator {
    /// Checks a value already known to be of the field's declared type,
    /// recording any failure against `field` in `errors`.
    fn check(&self, field: &str, value: &Value, errors: &mut ValidationErrors) {
        match self {
            Self::MinLength(min) => {
                if let Some(s) = value.as_str()
                    && s.chars().count() < *min
                {
                    errors.add(field, format!("must be at least {min} characters"));
                }
            }
            Self::MaxLength(max) => {
                if let Some(s) = value.as_str()
                    && s.chars().count() > *max
                {
                    errors.add(field, format!("must be at most {max} characters"));
                }
            }
            Self::Pattern(pattern) => {
                if let Some(s) = value.as_str()
                    && !pattern.is_match(s)
                {
                    errors.add(field, format!("must match pattern {}", pattern.as_str()));
                }
            }
            Self::OneOf(allowed) => {
                let ok = value
                    .as_str()
                    .is_some_and(|s| allowed.iter().any(|a| a == s));
                if !ok {
                    errors.add(field, format!("must be one of: {}", allowed.join(", ")));
                }
            }
        }
    }
}

/// Specification of one resource field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) writable: bool,
    pub(crate) exposed: bool,
    pub(crate) required_on_create: bool,
    pub(crate) persisted: bool,
    pub(crate) secret: bool,
    pub(crate) validators: Vec<FieldValidator>,
}

impl FieldSpec {
    fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            writable: true,
            exposed: true,
            required_on_create: false,
            persisted: true,
            secret: false,
            validators: Vec::new(),
        }
    }

    /// A writable, exposed string field.
    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// A writable, exposed integer field.
    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// A writable, exposed boolean field.
    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// A writable, exposed RFC 3339 timestamp field.
    #[must_use]
    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    /// A secret string field: never exposed, hashed one-way before the
    /// change-set reaches persistence.
    #[must_use]
    pub fn secret(name: impl Into<String>) -> Self {
        let mut spec = Self::new(name, FieldType::String);
        spec.secret = true;
        spec.exposed = false;
        spec
    }

    /// The field must be present when creating an entity.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required_on_create = true;
        self
    }

    /// The field is server-generated: payloads naming it are rejected.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// The field is accepted and validated but never stored (confirmation
    /// fields).
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.persisted = false;
        self.exposed = false;
        self
    }

    /// The field is stored but excluded from wire output.
    #[must_use]
    pub fn internal_only(mut self) -> Self {
        self.exposed = false;
        self
    }

    /// Attaches a validation rule.
    #[must_use]
    pub fn validate(mut self, validator: FieldValidator) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_exposed(&self) -> bool {
        self.exposed
    }

    /// Type-checks a payload value, then runs the field's validators.
    /// All failures accumulate into `errors`.
    pub(crate) fn check_value(&self, value: &Value, errors: &mut ValidationErrors) {
        let type_ok = match self.field_type {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.as_i64().is_some(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Timestamp => value
                .as_str()
                .is_some_and(|s| turnstile_core::parse_rfc3339(s).is_ok()),
        };
        if !type_ok {
            errors.add(&self.name, format!("must be a {}", self.field_type));
            return;
        }
        for validator in &self.validators {
            validator.check(&self.name, value, errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn errors_for(spec: &FieldSpec, value: Value) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        spec.check_value(&value, &mut errors);
        errors
    }

    #[test]
    fn test_type_check() {
        let spec = FieldSpec::integer("views");
        assert!(errors_for(&spec, json!(3)).is_empty());
        assert!(!errors_for(&spec, json!("three")).is_empty());
        assert!(!errors_for(&spec, json!(3.5)).is_empty());
        assert!(!errors_for(&spec, json!(null)).is_empty());
    }

    #[test]
    fn test_timestamp_check() {
        let spec = FieldSpec::timestamp("published_at");
        assert!(errors_for(&spec, json!("2024-01-01T00:00:00Z")).is_empty());
        assert!(!errors_for(&spec, json!("yesterday")).is_empty());
        assert!(!errors_for(&spec, json!(1704067200)).is_empty());
    }

    #[test]
    fn test_length_validators_accumulate() {
        let spec = FieldSpec::string("username")
            .validate(FieldValidator::MinLength(3))
            .validate(FieldValidator::Pattern(Regex::new("^[a-z]+$").unwrap()));

        let errors = errors_for(&spec, json!("A"));
        // Both rules failed, both messages recorded.
        assert_eq!(errors.get("username").unwrap().len(), 2);
    }

    #[test]
    fn test_one_of() {
        let spec = FieldSpec::string("status").validate(FieldValidator::OneOf(vec![
            "draft".to_string(),
            "published".to_string(),
        ]));
        assert!(errors_for(&spec, json!("draft")).is_empty());
        assert!(!errors_for(&spec, json!("archived")).is_empty());
    }

    #[test]
    fn test_type_failure_skips_validators() {
        let spec = FieldSpec::string("name").validate(FieldValidator::MinLength(100));
        let errors = errors_for(&spec, json!(7));
        assert_eq!(errors.get("name").unwrap().len(), 1);
    }

    #[test]
    fn test_secret_is_never_exposed() {
        let spec = FieldSpec::secret("password");
        assert!(!spec.is_exposed());
    }
}
