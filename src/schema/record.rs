//! Record instances
//!
//! A record owns its value store: only fields supplied at construction are
//! stored. Reads of unsupplied fields resolve to a fresh copy of the
//! descriptor default (or `Null`), so no two records ever share a mutable
//! default. Prepare hooks run on every read, never on write.

use std::fmt;
use std::sync::Arc;

use super::builder::Schema;
use super::errors::{SchemaError, SchemaResult};
use super::value::{mapping_to_json, FieldValue, Mapping};

/// A validated record of a schema.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Mapping,
}

impl Record {
    pub(crate) fn new(schema: Arc<Schema>, values: Mapping) -> Self {
        Self { schema, values }
    }

    /// The schema this record was constructed from.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Whether `name` was explicitly supplied (or set) on this record.
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Reads a declared or computed field.
    ///
    /// Returns `None` for names the schema does not know.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        if let Some(field) = self.schema.field(name) {
            let raw = self
                .values
                .get(name)
                .or_else(|| field.default_value())
                .cloned()
                .unwrap_or(FieldValue::Null);

            return Some(match self.schema.prepare_fn(name) {
                Some(prepare) => prepare(raw),
                None => raw,
            });
        }

        self.schema.computed_fn(name).map(|accessor| accessor(self))
    }

    /// Reassigns a declared field through the same coercion and validation
    /// pipeline used at construction.
    ///
    /// On failure the record is left unchanged.
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> SchemaResult<()> {
        let schema = Arc::clone(&self.schema);
        let field = schema.field(name).ok_or_else(|| SchemaError::UnknownFields {
            schema: schema.type_name().to_string(),
            fields: std::iter::once(name.to_string()).collect(),
        })?;

        let raw = value.into();
        if raw.is_null() && !field.is_required() {
            self.values.remove(name);
            return Ok(());
        }

        let cleaned = field.clean(&raw).map_err(|source| SchemaError::Field {
            schema: schema.type_name().to_string(),
            field: name.to_string(),
            source,
        })?;
        self.values.insert(name.to_string(), cleaned);
        Ok(())
    }

    /// Declared and computed fields in canonical order.
    pub fn to_dict(&self) -> Mapping {
        self.schema
            .declared_fields()
            .chain(self.schema.property_fields())
            .filter_map(|name| self.get(name).map(|value| (name.to_string(), value)))
            .collect()
    }

    /// Serializes the named fields, or every field when `names` is empty.
    ///
    /// Names must be declared or computed fields. Output is always in
    /// canonical order.
    pub fn serialize(&self, names: &[&str]) -> SchemaResult<Mapping> {
        if names.is_empty() {
            return Ok(self.to_dict());
        }

        let invalid: std::collections::BTreeSet<String> = names
            .iter()
            .filter(|name| !self.schema.is_serializable(name))
            .map(|name| name.to_string())
            .collect();
        if !invalid.is_empty() {
            return Err(SchemaError::InvalidSerializationFields {
                schema: self.schema.type_name().to_string(),
                fields: invalid,
            });
        }

        Ok(names
            .iter()
            .filter_map(|name| self.get(name).map(|value| (name.to_string(), value)))
            .collect())
    }

    /// `to_dict()` as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        mapping_to_json(&self.to_dict())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.values == other.values
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("schema", &self.schema.type_name())
            .field("values", &self.values)
            .finish()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.schema.declared_fields().collect();
        write!(
            f,
            "<{} instance, attributes:[{}]>",
            self.schema.type_name(),
            names.join(", ")
        )
    }
}
