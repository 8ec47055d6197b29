//! Type coercers
//!
//! Supported kinds:
//! - integer: 64-bit signed integer
//! - float: 64-bit floating point
//! - string: UTF-8 string
//! - boolean: strict "true"/"false" folding
//! - timestamp: `YYYY-MM-DD HH:MM:SS`, anything from the first `.` on is dropped
//! - mapping: string-keyed mapping, or JSON object text
//! - schema: nested record of another schema
//!
//! A value already of the target kind passes through unchanged. Anything
//! else goes through the cast, and any cast failure becomes `InvalidType`.

use chrono::NaiveDateTime;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use super::builder::Schema;
use super::errors::{InvalidType, SchemaError};
use super::value::{FieldValue, Mapping, TIMESTAMP_FORMAT};

/// Custom cast from an arbitrary value into the coercer's target kind.
pub type CastFn = Arc<dyn Fn(&FieldValue) -> Result<FieldValue, String> + Send + Sync>;

/// Target semantic type of a coercer
#[derive(Clone)]
pub enum FieldKind {
    Integer,
    Float,
    String,
    Boolean,
    Timestamp,
    Mapping,
    /// Nested record of another schema
    Schema(Arc<Schema>),
}

impl FieldKind {
    /// Returns the kind name used in error messages
    pub fn type_name(&self) -> String {
        match self {
            FieldKind::Integer => "integer".into(),
            FieldKind::Float => "float".into(),
            FieldKind::String => "string".into(),
            FieldKind::Boolean => "boolean".into(),
            FieldKind::Timestamp => "timestamp".into(),
            FieldKind::Mapping => "mapping".into(),
            FieldKind::Schema(schema) => format!("schema {}", schema.type_name()),
        }
    }

    /// Whether `value` already satisfies this kind.
    ///
    /// Nested schema output is a mapping, so a mapping is the satisfied form
    /// of a schema kind only after it went through construction. That check
    /// lives in the nested cast, not here.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (FieldKind::Integer, FieldValue::Integer(_))
            | (FieldKind::Float, FieldValue::Float(_))
            | (FieldKind::String, FieldValue::String(_))
            | (FieldKind::Boolean, FieldValue::Boolean(_))
            | (FieldKind::Timestamp, FieldValue::Timestamp(_))
            | (FieldKind::Mapping, FieldValue::Mapping(_)) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// A primitive or nested type adapter with an optional custom cast.
#[derive(Clone)]
pub struct Coercer {
    kind: FieldKind,
    cast: Option<CastFn>,
}

impl Coercer {
    /// Creates a coercer using the kind's built-in cast.
    pub fn new(kind: FieldKind) -> Self {
        Self { kind, cast: None }
    }

    /// Creates a coercer with a custom cast.
    ///
    /// The cast only runs on values not already of the target kind, and its
    /// output must itself be of the target kind.
    pub fn with_cast<F>(kind: FieldKind, cast: F) -> Self
    where
        F: Fn(&FieldValue) -> Result<FieldValue, String> + Send + Sync + 'static,
    {
        Self {
            kind,
            cast: Some(Arc::new(cast)),
        }
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn has_custom_cast(&self) -> bool {
        self.cast.is_some()
    }

    /// Coerces a value into the target kind.
    pub fn coerce(&self, value: &FieldValue) -> Result<FieldValue, InvalidType> {
        if let FieldKind::Schema(schema) = &self.kind {
            return coerce_nested(schema, self.cast.as_ref(), value);
        }

        if self.kind.accepts(value) {
            return Ok(value.clone());
        }

        match &self.cast {
            Some(cast) => {
                let cast_value = cast(value).map_err(|reason| {
                    tracing::trace!(target_kind = %self.kind, %reason, "custom cast failed");
                    InvalidType::new(value, self.kind.type_name()).with_reason(reason)
                })?;
                if self.kind.accepts(&cast_value) {
                    Ok(cast_value)
                } else {
                    Err(InvalidType::new(value, self.kind.type_name()))
                }
            }
            None => builtin_cast(&self.kind, value)
                .ok_or_else(|| InvalidType::new(value, self.kind.type_name())),
        }
    }
}

impl fmt::Debug for Coercer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercer")
            .field("kind", &self.kind)
            .field("custom_cast", &self.cast.is_some())
            .finish()
    }
}

impl From<FieldKind> for Coercer {
    fn from(kind: FieldKind) -> Self {
        Coercer::new(kind)
    }
}

fn builtin_cast(kind: &FieldKind, value: &FieldValue) -> Option<FieldValue> {
    match kind {
        FieldKind::Integer => cast_integer(value).map(FieldValue::Integer),
        FieldKind::Float => cast_float(value).map(FieldValue::Float),
        FieldKind::String => cast_string(value).map(FieldValue::String),
        FieldKind::Boolean => cast_boolean(value).map(FieldValue::Boolean),
        FieldKind::Timestamp => cast_timestamp(value).map(FieldValue::Timestamp),
        FieldKind::Mapping => cast_mapping(value).map(FieldValue::Mapping),
        // Nested schemas never reach the primitive casts
        FieldKind::Schema(_) => None,
    }
}

fn cast_integer(value: &FieldValue) -> Option<i64> {
    match value {
        FieldValue::String(s) => s.trim().parse::<i64>().ok(),
        // Only integral floats inside [-2^63, 2^63) convert exactly;
        // `as` saturates outside that range
        FieldValue::Float(f)
            if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
        {
            Some(*f as i64)
        }
        _ => None,
    }
}

fn cast_float(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Integer(i) => Some(*i as f64),
        FieldValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn cast_string(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Integer(i) => Some(i.to_string()),
        FieldValue::Float(f) => Some(f.to_string()),
        FieldValue::Boolean(b) => Some(b.to_string()),
        FieldValue::Timestamp(ts) => Some(ts.format(TIMESTAMP_FORMAT).to_string()),
        _ => None,
    }
}

fn cast_boolean(value: &FieldValue) -> Option<bool> {
    match value {
        FieldValue::String(s) => match s.to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn cast_timestamp(value: &FieldValue) -> Option<NaiveDateTime> {
    let text = value.as_str()?;
    let head = text.split('.').next().unwrap_or(text);
    NaiveDateTime::parse_from_str(head, TIMESTAMP_FORMAT).ok()
}

fn cast_mapping(value: &FieldValue) -> Option<Mapping> {
    let text = value.as_str()?;
    match serde_json::from_str::<serde_json::Value>(text).ok()? {
        serde_json::Value::Object(map) => Some(
            map.into_iter()
                .map(|(k, v)| (k, FieldValue::from(v)))
                .collect(),
        ),
        _ => None,
    }
}

/// Nested-schema coercion.
///
/// - a record of the same schema passes through as its serialization
/// - a mapping constructs the nested schema; keys naming the nested
///   schema's computed fields are set aside first so output re-coerces,
///   and any whose value differs from the computed one is an unknown field
/// - anything else goes through the custom cast, if any, and must yield a
///   mapping that then constructs
fn coerce_nested(
    schema: &Arc<Schema>,
    cast: Option<&CastFn>,
    value: &FieldValue,
) -> Result<FieldValue, InvalidType> {
    let target = || format!("schema {}", schema.type_name());

    let input = match value {
        FieldValue::Record(record) if Arc::ptr_eq(record.schema(), schema) => {
            return Ok(FieldValue::Mapping(record.to_dict()));
        }
        FieldValue::Mapping(map) => map.clone(),
        other => match cast {
            Some(cast) => match cast(other) {
                Ok(FieldValue::Mapping(map)) => map,
                _ => return Err(InvalidType::new(value, target())),
            },
            None => return Err(InvalidType::new(value, target())),
        },
    };

    let (supplied, input): (Mapping, Mapping) = input
        .into_iter()
        .partition(|(name, _)| schema.is_property_field(name));

    let record = schema
        .construct(input)
        .map_err(|err| InvalidType::nested(value, target(), err))?;

    // Computed keys are only tolerated when they repeat the record's own output
    let stale: BTreeSet<String> = supplied
        .into_iter()
        .filter(|(name, given)| record.get(name).as_ref() != Some(given))
        .map(|(name, _)| name)
        .collect();
    if !stale.is_empty() {
        let err = SchemaError::UnknownFields {
            schema: schema.type_name().to_string(),
            fields: stale,
        };
        return Err(InvalidType::nested(value, target(), err));
    }

    Ok(FieldValue::Mapping(record.to_dict()))
}
