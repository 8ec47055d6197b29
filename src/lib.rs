//! schema-factory - declarative record schemas
//!
//! Field descriptors with strict coercion, ordered validators, nested
//! schemas, computed fields and canonical-order serialization.

pub mod schema;

pub use schema::{
    Field, FieldKind, FieldValue, Mapping, Record, Schema, SchemaBuilder, SchemaError,
    SchemaErrorCode, SchemaRegistry, SchemaResult, Validator,
};
