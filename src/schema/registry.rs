//! In-memory schema registry and declarative schema definitions
//!
//! - Schemas are registered once under their name and never replaced
//! - Declarative definitions (`SchemaDefinition`) deserialize from JSON
//! - Nested references resolve against already registered schemas, so
//!   schema graphs are DAGs by construction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::builder::Schema;
use super::errors::{SchemaError, SchemaResult};
use super::field::Field;
use super::types::FieldKind;
use super::validator::Validator;
use super::value::FieldValue;

/// Declared type of a field in a definition document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum KindSpec {
    Integer,
    Float,
    String,
    Boolean,
    Timestamp,
    Mapping,
    /// Nested record of a registered schema
    Schema {
        /// Name of the nested schema
        schema: String,
    },
}

/// Validator rule in a definition document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleSpec {
    Range {
        min: f64,
        max: f64,
        #[serde(default)]
        message: Option<String>,
    },
    Min {
        value: f64,
        #[serde(default)]
        message: Option<String>,
    },
    Max {
        value: f64,
        #[serde(default)]
        message: Option<String>,
    },
    OneOf {
        values: Vec<serde_json::Value>,
        #[serde(default)]
        message: Option<String>,
    },
    Pattern {
        pattern: String,
        #[serde(default)]
        message: Option<String>,
    },
    Length {
        min: usize,
        max: usize,
        #[serde(default)]
        message: Option<String>,
    },
    NonEmpty {
        #[serde(default)]
        message: Option<String>,
    },
}

impl RuleSpec {
    fn message(&self) -> Option<&String> {
        match self {
            RuleSpec::Range { message, .. }
            | RuleSpec::Min { message, .. }
            | RuleSpec::Max { message, .. }
            | RuleSpec::OneOf { message, .. }
            | RuleSpec::Pattern { message, .. }
            | RuleSpec::Length { message, .. }
            | RuleSpec::NonEmpty { message } => message.as_ref(),
        }
    }

    fn to_validator(&self) -> Result<Validator, String> {
        let validator = match self {
            RuleSpec::Range { min, max, .. } => Validator::range(*min, *max),
            RuleSpec::Min { value, .. } => Validator::min(*value),
            RuleSpec::Max { value, .. } => Validator::max(*value),
            RuleSpec::OneOf { values, .. } => {
                Validator::one_of(values.iter().map(FieldValue::from))
            }
            RuleSpec::Pattern { pattern, .. } => {
                Validator::pattern(pattern).map_err(|e| format!("invalid pattern: {}", e))?
            }
            RuleSpec::Length { min, max, .. } => Validator::length(*min, *max),
            RuleSpec::NonEmpty { .. } => Validator::non_empty(),
        };

        Ok(match self.message() {
            Some(message) => validator.with_message(message.clone()),
            None => validator,
        })
    }
}

/// Field specification in a definition document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field type
    #[serde(flatten)]
    pub kind: KindSpec,
    /// Whether the field holds an array of `kind`
    #[serde(default)]
    pub array: bool,
    /// Whether the field must be supplied
    #[serde(default)]
    pub required: bool,
    /// Value read back when the field is not supplied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Validator rules, applied in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<RuleSpec>,
}

/// Declarative schema definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Schema name
    pub name: String,
    /// Field specifications by name
    pub fields: BTreeMap<String, FieldSpec>,
}

/// Registry of named schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<Schema>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a built schema under its name.
    pub fn register(&mut self, schema: Arc<Schema>) -> SchemaResult<Arc<Schema>> {
        if self.schemas.contains_key(schema.name()) {
            return Err(SchemaError::AlreadyRegistered(schema.name().to_string()));
        }

        tracing::info!(schema = %schema.type_name(), "schema registered");
        self.schemas
            .insert(schema.name().to_string(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Gets a schema by name.
    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.schemas.get(name)
    }

    /// Gets a schema by name, failing with `UnknownSchema`.
    pub fn require(&self, name: &str) -> SchemaResult<&Arc<Schema>> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownSchema(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Builds and registers a schema from a declarative definition.
    pub fn load_definition(&mut self, definition: &SchemaDefinition) -> SchemaResult<Arc<Schema>> {
        if self.contains(&definition.name) {
            return Err(SchemaError::AlreadyRegistered(definition.name.clone()));
        }

        let mut builder = Schema::builder(definition.name.clone());
        for (name, spec) in &definition.fields {
            let field = self.field_from_spec(&definition.name, name, spec)?;
            builder = builder.field(name.clone(), field);
        }

        let schema = builder.build()?;
        self.register(schema)
    }

    /// Parses a JSON definition document and registers it.
    pub fn load_json(&mut self, text: &str) -> SchemaResult<Arc<Schema>> {
        let definition: SchemaDefinition = serde_json::from_str(text).map_err(|e| {
            SchemaError::invalid_definition("<json>", format!("Invalid JSON: {}", e))
        })?;
        self.load_definition(&definition)
    }

    fn field_from_spec(&self, schema: &str, name: &str, spec: &FieldSpec) -> SchemaResult<Field> {
        let kind = match &spec.kind {
            KindSpec::Integer => FieldKind::Integer,
            KindSpec::Float => FieldKind::Float,
            KindSpec::String => FieldKind::String,
            KindSpec::Boolean => FieldKind::Boolean,
            KindSpec::Timestamp => FieldKind::Timestamp,
            KindSpec::Mapping => FieldKind::Mapping,
            KindSpec::Schema { schema } => FieldKind::Schema(Arc::clone(self.require(schema)?)),
        };

        let mut field = Field::new(kind);
        if spec.array {
            field = field.array();
        }
        if spec.required {
            field = field.required();
        }
        if let Some(default) = &spec.default {
            field = field.with_default(FieldValue::from(default));
        }
        for rule in &spec.validators {
            let validator = rule.to_validator().map_err(|reason| {
                SchemaError::invalid_definition(schema, format!("field '{}': {}", name, reason))
            })?;
            field = field.with_validator(validator);
        }

        Ok(field)
    }
}
