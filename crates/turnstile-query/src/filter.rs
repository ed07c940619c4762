//! Filter Engine: translates raw query parameters into a validated predicate
//! set.
//!
//! Every filterable field must be declared in a per-resource [`FilterSchema`]
//! allow-list together with its semantic type and the operators permitted on
//! it. Parameters naming undeclared fields, disallowed operators, or values
//! that fail type coercion are rejected with `InvalidFilter`. Unknown
//! parameters are rejected by default; silently ignoring them is an explicit
//! configuration choice, never the implicit one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use turnstile_core::{PipelineError, Result};

/// Parameter names consumed by the paginator, never treated as filters.
const RESERVED_PARAMS: &[&str] = &["page", "per_page"];

/// Semantic type of a filterable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    Timestamp,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
            Self::Timestamp => write!(f, "timestamp"),
        }
    }
}

/// Comparison operator applied by a filter condition.
///
/// Spelled as a `:op` suffix on the parameter name, e.g. `title:prefix=Ab`
/// or `created_at:since=2024-01-01T00:00:00Z`. A bare parameter name means
/// equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// String starts-with.
    Prefix,
    /// Strictly greater than.
    Gt,
    /// Strictly less than.
    Lt,
    /// Timestamp at or after the given instant.
    Since,
    /// Timestamp at or before the given instant.
    Until,
}

impl FilterOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Self::Eq),
            "prefix" => Some(Self::Prefix),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "since" => Some(Self::Since),
            "until" => Some(Self::Until),
            _ => None,
        }
    }

    /// Whether this operator makes sense for a field of the given type.
    #[must_use]
    pub fn supports(&self, field_type: FieldType) -> bool {
        match self {
            Self::Eq => true,
            Self::Prefix => field_type == FieldType::String,
            Self::Gt | Self::Lt => {
                matches!(field_type, FieldType::Integer | FieldType::Timestamp)
            }
            Self::Since | Self::Until => field_type == FieldType::Timestamp,
        }
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq => write!(f, "eq"),
            Self::Prefix => write!(f, "prefix"),
            Self::Gt => write!(f, "gt"),
            Self::Lt => write!(f, "lt"),
            Self::Since => write!(f, "since"),
            Self::Until => write!(f, "until"),
        }
    }
}

/// Allow-list entry for one filterable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    field_type: FieldType,
    ops: Vec<FilterOp>,
}

impl FieldRule {
    /// Creates a rule permitting equality only.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ops: vec![FilterOp::Eq],
        }
    }

    /// Additionally permits an operator. Operators incompatible with the
    /// field type are rejected at schema construction, not at request time.
    #[must_use]
    pub fn allow(mut self, op: FilterOp) -> Self {
        assert!(
            op.supports(self.field_type),
            "operator {op} is not valid for {} fields",
            self.field_type
        );
        if !self.ops.contains(&op) {
            self.ops.push(op);
        }
        self
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[must_use]
    pub fn permits(&self, op: FilterOp) -> bool {
        self.ops.contains(&op)
    }
}

/// How to treat query parameters that name no declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownParams {
    /// Fail the request with `InvalidFilter`. Prevents silently-ignored
    /// typos from masking caller bugs.
    #[default]
    Reject,
    /// Drop unknown parameters without error.
    Ignore,
}

/// Per-resource allow-list of filterable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSchema {
    fields: BTreeMap<String, FieldRule>,
}

impl FilterSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a filterable field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.get(name)
    }

    /// Validates raw query parameters into a [`FilterSpec`].
    ///
    /// Parameters reserved for pagination are skipped. Order of the supplied
    /// parameters is irrelevant; conditions are sorted for deterministic
    /// cache keys.
    pub fn parse(
        &self,
        params: &[(String, String)],
        unknown: UnknownParams,
    ) -> Result<FilterSpec> {
        let mut conditions = Vec::new();

        for (raw_name, raw_value) in params {
            if RESERVED_PARAMS.contains(&raw_name.as_str()) {
                continue;
            }

            let (field, op) = match raw_name.split_once(':') {
                Some((field, modifier)) => {
                    let op = FilterOp::parse(modifier).ok_or_else(|| {
                        PipelineError::invalid_filter(format!(
                            "unknown operator '{modifier}' on field '{field}'"
                        ))
                    })?;
                    (field, op)
                }
                None => (raw_name.as_str(), FilterOp::Eq),
            };

            let Some(rule) = self.fields.get(field) else {
                match unknown {
                    UnknownParams::Reject => {
                        return Err(PipelineError::invalid_filter(format!(
                            "field '{field}' is not filterable"
                        )));
                    }
                    UnknownParams::Ignore => {
                        tracing::debug!(field, "ignoring unknown filter parameter");
                        continue;
                    }
                }
            };

            if !rule.permits(op) {
                return Err(PipelineError::invalid_filter(format!(
                    "operator '{op}' is not permitted on field '{field}'"
                )));
            }

            let value = coerce(field, rule.field_type(), op, raw_value)?;
            conditions.push(Condition {
                field: field.to_string(),
                op,
                value,
            });
        }

        conditions.sort_by(|a, b| (&a.field, a.op).cmp(&(&b.field, b.op)));
        Ok(FilterSpec { conditions })
    }
}

/// Coerce a raw parameter value to the field's semantic type.
///
/// Range operators on timestamp fields always take a timestamp operand,
/// whatever the field's storage shape.
fn coerce(field: &str, field_type: FieldType, op: FilterOp, raw: &str) -> Result<FilterValue> {
    let target = match op {
        FilterOp::Since | FilterOp::Until => FieldType::Timestamp,
        _ => field_type,
    };

    match target {
        FieldType::String => Ok(FilterValue::String(raw.to_string())),
        FieldType::Integer => raw.parse::<i64>().map(FilterValue::Integer).map_err(|_| {
            PipelineError::invalid_filter(format!(
                "value '{raw}' for field '{field}' is not an integer"
            ))
        }),
        FieldType::Boolean => match raw {
            "true" => Ok(FilterValue::Boolean(true)),
            "false" => Ok(FilterValue::Boolean(false)),
            _ => Err(PipelineError::invalid_filter(format!(
                "value '{raw}' for field '{field}' is not a boolean"
            ))),
        },
        FieldType::Timestamp => turnstile_core::parse_rfc3339(raw)
            .map(FilterValue::Timestamp)
            .map_err(|_| {
                PipelineError::invalid_filter(format!(
                    "value '{raw}' for field '{field}' is not an RFC 3339 timestamp"
                ))
            }),
    }
}

/// A coerced filter operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    #[serde(with = "time::serde::rfc3339")]
    Timestamp(OffsetDateTime),
}

impl FilterValue {
    /// Canonical text form, used for deterministic cache keys.
    #[must_use]
    pub fn canonical(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Timestamp(ts) => turnstile_core::format_rfc3339(*ts),
        }
    }
}

/// One validated filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Condition {
    /// Evaluates this condition against an entity's field map.
    #[must_use]
    pub fn matches(&self, fields: &Value) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };

        match (&self.value, self.op) {
            (FilterValue::String(expected), FilterOp::Eq) => {
                actual.as_str() == Some(expected.as_str())
            }
            (FilterValue::String(expected), FilterOp::Prefix) => actual
                .as_str()
                .is_some_and(|s| s.starts_with(expected.as_str())),
            (FilterValue::Integer(expected), op) => {
                let Some(n) = actual.as_i64() else {
                    return false;
                };
                match op {
                    FilterOp::Eq => n == *expected,
                    FilterOp::Gt => n > *expected,
                    FilterOp::Lt => n < *expected,
                    _ => false,
                }
            }
            (FilterValue::Boolean(expected), FilterOp::Eq) => actual.as_bool() == Some(*expected),
            (FilterValue::Timestamp(expected), op) => {
                let Some(ts) = actual
                    .as_str()
                    .and_then(|s| turnstile_core::parse_rfc3339(s).ok())
                else {
                    return false;
                };
                match op {
                    FilterOp::Eq => ts == *expected,
                    FilterOp::Gt => ts > *expected,
                    FilterOp::Lt => ts < *expected,
                    FilterOp::Since => ts >= *expected,
                    FilterOp::Until => ts <= *expected,
                    FilterOp::Prefix => false,
                }
            }
            _ => false,
        }
    }
}

/// A validated predicate set: the output of the Filter Engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    conditions: Vec<Condition>,
}

impl FilterSpec {
    /// The empty filter, matching every entity.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns `true` if the entity's fields satisfy every condition.
    #[must_use]
    pub fn matches(&self, fields: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(fields))
    }

    /// Deterministic text form of the whole predicate set, suitable as a
    /// cache key component. Conditions are already sorted by (field, op).
    #[must_use]
    pub fn canonical_key(&self) -> String {
        self.conditions
            .iter()
            .map(|c| format!("{}:{}={}", c.field, c.op, c.value.canonical()))
            .collect::<Vec<_>>()
            .join("&")
    }
}
