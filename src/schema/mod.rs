//! Schema subsystem
//!
//! Declarative record schemas: named field descriptors with a type, array
//! cardinality, required flag, default and validators, built into an
//! immutable `Schema` that constructs validated `Record`s from untyped input.
//!
//! # Design Principles
//!
//! - A schema is data: an ordered field table, not runtime attribute magic
//! - Structural checks (unknown, then missing fields) precede value checks
//! - Coercion is strict: values already of the target kind pass through
//! - No partially valid record escapes construction
//! - Serialization is in canonical (sorted field name) order
//!
//! # Usage
//!
//! ```
//! use schema_factory::schema::{Field, FieldValue, Schema, Validator};
//!
//! let point = Schema::build(
//!     "point",
//!     [("lat", Field::float().required()), ("lng", Field::float().required())],
//! )
//! .unwrap();
//!
//! let user = Schema::builder("user")
//!     .field("name", Field::string().required())
//!     .field(
//!         "age",
//!         Field::integer().with_validator(
//!             Validator::range(18.0, 30.0).with_message("Age must be between 18 and 30."),
//!         ),
//!     )
//!     .field("home", Field::schema(&point))
//!     .build()
//!     .unwrap();
//!
//! let record = user
//!     .from_json(&serde_json::json!({
//!         "name": "Bill",
//!         "age": "21",
//!         "home": {"lat": "34", "lng": 0}
//!     }))
//!     .unwrap();
//!
//! assert_eq!(record.get("age"), Some(FieldValue::Integer(21)));
//! assert_eq!(
//!     record.to_json()["home"],
//!     serde_json::json!({"lat": 34.0, "lng": 0.0})
//! );
//! ```

mod builder;
mod errors;
mod field;
mod record;
mod registry;
mod types;
mod validator;
mod value;

pub use builder::{ComputedFn, PrepareFn, Schema, SchemaBuilder, ValidationConfig};
pub use errors::{
    FieldError, InvalidType, SchemaError, SchemaErrorCode, SchemaResult, ValidatorFailed,
};
pub use field::Field;
pub use record::Record;
pub use registry::{FieldSpec, KindSpec, RuleSpec, SchemaDefinition, SchemaRegistry};
pub use types::{CastFn, Coercer, FieldKind};
pub use validator::Validator;
pub use value::{mapping_to_json, FieldValue, Mapping, TIMESTAMP_FORMAT};
