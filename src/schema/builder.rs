//! Schema builder
//!
//! A schema is data: an immutable table of named field descriptors plus the
//! derived required set, computed (property) accessors and per-field prepare
//! hooks. `SchemaBuilder::build` assigns field names, checks the definition
//! and returns the schema behind an `Arc` so records and nested fields can
//! share it.
//!
//! Construction order for a record:
//! 1. Unknown-field check
//! 2. Required-field check
//! 3. Per-field coercion, then validation
//! 4. Commit of all coerced values

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::errors::{SchemaError, SchemaResult};
use super::field::Field;
use super::record::Record;
use super::value::{FieldValue, Mapping};

/// Computed accessor evaluated against a constructed record
pub type ComputedFn = Arc<dyn Fn(&Record) -> FieldValue + Send + Sync>;

/// Read-time transform applied to a declared field's stored or default value
pub type PrepareFn = Arc<dyn Fn(FieldValue) -> FieldValue + Send + Sync>;

/// Per-schema validation behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Stop at the first field error
    pub fail_fast: bool,
    /// Maximum number of field errors to collect (0 = unlimited)
    pub max_errors: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            fail_fast: true,
            max_errors: 0,
        }
    }
}

impl ValidationConfig {
    /// First field error wins
    pub fn fail_fast() -> Self {
        Self::default()
    }

    /// Collect every field error into one `SchemaError::Multiple`
    pub fn collect_all() -> Self {
        Self {
            fail_fast: false,
            max_errors: 0,
        }
    }

    /// Set maximum number of errors to collect
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }
}

/// An immutable schema definition.
pub struct Schema {
    name: String,
    type_name: String,
    fields: BTreeMap<String, Field>,
    required: BTreeSet<String>,
    computed: BTreeMap<String, ComputedFn>,
    prepare: BTreeMap<String, PrepareFn>,
    config: ValidationConfig,
}

impl Schema {
    /// Starts a schema definition.
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// Builds a schema from named field descriptors only.
    pub fn build<I, K>(name: impl Into<String>, fields: I) -> SchemaResult<Arc<Schema>>
    where
        I: IntoIterator<Item = (K, Field)>,
        K: Into<String>,
    {
        fields
            .into_iter()
            .fold(SchemaBuilder::new(name), |builder, (key, field)| {
                builder.field(key, field)
            })
            .build()
    }

    /// Schema name as given at definition time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Title-cased name with a `Schema` suffix, e.g. `PointSchema`.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared field names in canonical (sorted) order.
    pub fn declared_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Names of required fields.
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }

    /// Computed field names in sorted order.
    pub fn property_fields(&self) -> impl Iterator<Item = &str> {
        self.computed.keys().map(String::as_str)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn is_property_field(&self, name: &str) -> bool {
        self.computed.contains_key(name)
    }

    /// Whether `name` can appear in serialization output.
    pub fn is_serializable(&self, name: &str) -> bool {
        self.is_declared(name) || self.is_property_field(name)
    }

    pub fn config(&self) -> ValidationConfig {
        self.config
    }

    pub(crate) fn computed_fn(&self, name: &str) -> Option<&ComputedFn> {
        self.computed.get(name)
    }

    pub(crate) fn prepare_fn(&self, name: &str) -> Option<&PrepareFn> {
        self.prepare.get(name)
    }

    /// Constructs a validated record.
    ///
    /// Structural checks run before any value is coerced. No partially valid
    /// record is ever returned.
    pub fn construct<I, K, V>(self: &Arc<Self>, input: I) -> SchemaResult<Record>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let input: BTreeMap<String, FieldValue> = input
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let result = self.clean_input(&input);
        match &result {
            Ok(values) => {
                tracing::trace!(
                    schema = %self.type_name,
                    fields = values.len(),
                    "record constructed"
                );
            }
            Err(err) => {
                tracing::debug!(
                    schema = %self.type_name,
                    code = %err.code(),
                    error = %err,
                    "record rejected"
                );
            }
        }

        result.map(|values| Record::new(Arc::clone(self), values))
    }

    /// Constructs a validated record from a decoded JSON object.
    pub fn from_json(self: &Arc<Self>, value: &serde_json::Value) -> SchemaResult<Record> {
        let object = value.as_object().ok_or_else(|| SchemaError::NotAMapping {
            schema: self.type_name.clone(),
            actual: FieldValue::from(value).type_name().to_string(),
        })?;

        self.construct(object.iter().map(|(k, v)| (k.as_str(), FieldValue::from(v))))
    }

    /// Runs the construction checks and returns the coerced value store.
    fn clean_input(&self, input: &BTreeMap<String, FieldValue>) -> SchemaResult<Mapping> {
        let unknown: BTreeSet<String> = input
            .keys()
            .filter(|key| !self.fields.contains_key(*key))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(SchemaError::UnknownFields {
                schema: self.type_name.clone(),
                fields: unknown,
            });
        }

        let missing: BTreeSet<String> = self
            .required
            .iter()
            .filter(|name| !input.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingRequired {
                schema: self.type_name.clone(),
                fields: missing,
            });
        }

        let mut values = Mapping::new();
        let mut errors = Vec::new();

        for (name, raw) in input {
            let field = match self.fields.get(name) {
                Some(field) => field,
                None => continue,
            };

            // An explicit null on an optional field means "not supplied"
            if raw.is_null() && !field.is_required() {
                continue;
            }

            match field.clean(raw) {
                Ok(value) => {
                    values.insert(name.clone(), value);
                }
                Err(source) => {
                    let err = SchemaError::Field {
                        schema: self.type_name.clone(),
                        field: name.clone(),
                        source,
                    };
                    if self.config.fail_fast {
                        return Err(err);
                    }
                    errors.push(err);
                    if self.config.max_errors > 0 && errors.len() >= self.config.max_errors {
                        break;
                    }
                }
            }
        }

        match errors.len() {
            0 => Ok(values),
            1 => Err(errors.remove(0)),
            _ => Err(SchemaError::Multiple {
                schema: self.type_name.clone(),
                errors,
            }),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("required", &self.required)
            .field("property_fields", &self.computed.keys().collect::<Vec<_>>())
            .field("prepare", &self.prepare.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for [`Schema`]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<(String, Field)>,
    computed: Vec<(String, ComputedFn)>,
    prepare: Vec<(String, PrepareFn)>,
    config: ValidationConfig,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            computed: Vec::new(),
            prepare: Vec::new(),
            config: ValidationConfig::default(),
        }
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    /// Declares a read-only computed field.
    pub fn computed<F>(mut self, name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&Record) -> FieldValue + Send + Sync + 'static,
    {
        self.computed.push((name.into(), Arc::new(accessor)));
        self
    }

    /// Registers a read-time transform for a declared field.
    pub fn prepare<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(FieldValue) -> FieldValue + Send + Sync + 'static,
    {
        self.prepare.push((name.into(), Arc::new(transform)));
        self
    }

    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the definition and produces the schema.
    pub fn build(self) -> SchemaResult<Arc<Schema>> {
        let type_name = schema_type_name(&self.name);

        let mut fields = BTreeMap::new();
        for (name, mut field) in self.fields {
            if name.is_empty() {
                return Err(SchemaError::invalid_definition(&type_name, "empty field name"));
            }
            if fields.contains_key(&name) {
                return Err(SchemaError::invalid_definition(
                    &type_name,
                    format!("duplicate field '{}'", name),
                ));
            }

            field.set_name(&name);

            if let Some(default) = field.default_value().cloned() {
                let cleaned = field.clean(&default).map_err(|err| {
                    SchemaError::invalid_definition(
                        &type_name,
                        format!("default for '{}' is invalid: {}", name, err),
                    )
                })?;
                field.set_default(cleaned);
            }

            fields.insert(name, field);
        }

        let mut computed = BTreeMap::new();
        for (name, accessor) in self.computed {
            if fields.contains_key(&name) || computed.contains_key(&name) {
                return Err(SchemaError::invalid_definition(
                    &type_name,
                    format!("computed field '{}' clashes with an existing field", name),
                ));
            }
            computed.insert(name, accessor);
        }

        let mut prepare = BTreeMap::new();
        for (name, transform) in self.prepare {
            if !fields.contains_key(&name) {
                return Err(SchemaError::invalid_definition(
                    &type_name,
                    format!("prepare hook for undeclared field '{}'", name),
                ));
            }
            prepare.insert(name, transform);
        }

        let required = fields
            .values()
            .filter(|field| field.is_required())
            .map(|field| field.name().to_string())
            .collect();

        tracing::debug!(
            schema = %type_name,
            fields = fields.len(),
            computed = computed.len(),
            "schema built"
        );

        Ok(Arc::new(Schema {
            name: self.name,
            type_name,
            fields,
            required,
            computed,
            prepare,
            config: self.config,
        }))
    }
}

/// `bound` -> `BoundSchema`, `geo_point` -> `Geo_PointSchema`.
fn schema_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 6);
    let mut at_word_start = true;
    for c in name.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out.push_str("Schema");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::SchemaErrorCode;
    use crate::schema::validator::Validator;

    fn mock_schema() -> Arc<Schema> {
        Schema::build(
            "test",
            [
                ("number", Field::integer().with_default(1)),
                ("name", Field::string().with_default("this")),
                (
                    "scores",
                    Field::float().array().with_default(Vec::<f64>::new()),
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_type_name() {
        assert_eq!(schema_type_name("point"), "PointSchema");
        assert_eq!(schema_type_name("Bound"), "BoundSchema");
        assert_eq!(schema_type_name("geo point"), "Geo PointSchema");
        assert_eq!(mock_schema().type_name(), "TestSchema");
    }

    #[test]
    fn test_declared_fields_sorted() {
        let schema = mock_schema();
        let fields: Vec<&str> = schema.declared_fields().collect();
        assert_eq!(fields, vec!["name", "number", "scores"]);
        assert!(schema.required().is_empty());
    }

    #[test]
    fn test_field_names_assigned() {
        let schema = mock_schema();
        assert_eq!(schema.field("scores").unwrap().name(), "scores");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let err = Schema::builder("dup")
            .field("a", Field::integer())
            .field("a", Field::string())
            .build()
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::InvalidDefinition);
    }

    #[test]
    fn test_computed_clash_rejected() {
        let err = Schema::builder("point")
            .field("lat", Field::float())
            .computed("lat", |_| FieldValue::Null)
            .build()
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::InvalidDefinition);
    }

    #[test]
    fn test_prepare_for_undeclared_field_rejected() {
        let err = Schema::builder("point")
            .field("lat", Field::float())
            .prepare("lng", |v| v)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("lng"));
    }

    #[test]
    fn test_default_is_coerced_at_build() {
        let schema = Schema::build("s", [("n", Field::float().with_default("2.5"))]).unwrap();
        assert_eq!(
            schema.field("n").unwrap().default_value(),
            Some(&FieldValue::Float(2.5))
        );
    }

    #[test]
    fn test_invalid_default_rejected() {
        let err = Schema::build(
            "s",
            [(
                "n",
                Field::integer()
                    .with_default(100)
                    .with_validator(Validator::max(50.0)),
            )],
        )
        .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::InvalidDefinition);

        assert!(Schema::build("s", [("n", Field::integer().with_default("abc"))]).is_err());
    }

    #[test]
    fn test_collect_all_aggregates_field_errors() {
        let schema = Schema::builder("pair")
            .field("a", Field::integer())
            .field("b", Field::integer())
            .with_config(ValidationConfig::collect_all())
            .build()
            .unwrap();

        let err = schema.construct([("a", "x"), ("b", "y")]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MultipleErrors);
        match err {
            SchemaError::Multiple { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_max_errors_caps_collection() {
        let schema = Schema::builder("triple")
            .field("a", Field::integer())
            .field("b", Field::integer())
            .field("c", Field::integer())
            .with_config(ValidationConfig::collect_all().with_max_errors(2))
            .build()
            .unwrap();

        match schema.construct([("a", "x"), ("b", "y"), ("c", "z")]).unwrap_err() {
            SchemaError::Multiple { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_fail_fast_returns_single_field_error() {
        let schema = Schema::build(
            "pair",
            [("a", Field::integer()), ("b", Field::integer())],
        )
        .unwrap();

        let err = schema.construct([("a", "x"), ("b", "y")]).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::InvalidType);
        assert_eq!(err.field_name(), Some("a"));
    }

    #[test]
    fn test_from_json_requires_object() {
        let schema = mock_schema();
        let err = schema.from_json(&serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::NotAMapping);
    }
}
