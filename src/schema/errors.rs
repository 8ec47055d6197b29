//! Schema error types
//!
//! Three distinguishable layers:
//! - `InvalidType`: a coercer could not produce its target kind
//! - `ValidatorFailed`: a validator predicate rejected a coerced value
//! - `SchemaError`: record-level failures (structure, wrapped field errors,
//!   definition and registry errors)
//!
//! Error codes:
//! - SCHEMA_UNKNOWN_FIELDS
//! - SCHEMA_MISSING_REQUIRED
//! - SCHEMA_INVALID_SERIALIZATION_FIELDS
//! - SCHEMA_INVALID_TYPE
//! - SCHEMA_VALIDATOR_FAILED
//! - SCHEMA_MULTIPLE_ERRORS
//! - SCHEMA_INVALID_DEFINITION
//! - SCHEMA_NOT_A_MAPPING
//! - SCHEMA_UNKNOWN_SCHEMA
//! - SCHEMA_ALREADY_REGISTERED

use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Raised by a type coercer when a value cannot be cast to its target kind.
#[derive(Debug, Clone, Error)]
#[error("Invalid value {value} for {target}{}", reason_suffix(.reason))]
pub struct InvalidType {
    /// Rendering of the offending value
    pub value: String,
    /// Target kind name (e.g. "float", "schema PointSchema")
    pub target: String,
    /// Failure reason reported by a custom cast
    pub reason: Option<String>,
    /// Nested schema failure, when the target is a nested schema
    #[source]
    pub cause: Option<Box<SchemaError>>,
}

impl InvalidType {
    pub fn new(value: impl fmt::Display, target: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            target: target.into(),
            reason: None,
            cause: None,
        }
    }

    /// Attaches the reason a custom cast gave for rejecting the value.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Wraps a nested schema failure.
    pub fn nested(value: impl fmt::Display, target: impl Into<String>, cause: SchemaError) -> Self {
        Self {
            value: value.to_string(),
            target: target.into(),
            reason: None,
            cause: Some(Box::new(cause)),
        }
    }
}

/// Raised when a validator predicate returns false.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidatorFailed {
    /// The validator's declared message, verbatim
    pub message: String,
}

impl ValidatorFailed {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Field-level failure produced by a field descriptor.
#[derive(Debug, Clone, Error)]
pub enum FieldError {
    #[error(transparent)]
    InvalidType(#[from] InvalidType),

    #[error("{value} rejected: {source}")]
    ValidatorFailed {
        /// Rendering of the rejected value
        value: String,
        #[source]
        source: ValidatorFailed,
    },
}

impl FieldError {
    /// Returns the validator message if this is a validator failure.
    pub fn validator_message(&self) -> Option<&str> {
        match self {
            FieldError::ValidatorFailed { source, .. } => Some(&source.message),
            FieldError::InvalidType(_) => None,
        }
    }

    /// Returns the coercion failure if this is a type error.
    pub fn invalid_type(&self) -> Option<&InvalidType> {
        match self {
            FieldError::InvalidType(err) => Some(err),
            FieldError::ValidatorFailed { .. } => None,
        }
    }
}

/// Schema-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaErrorCode {
    /// Input names fields the schema does not declare
    UnknownFields,
    /// Input omits required fields
    MissingRequired,
    /// Serialization requested undeclared fields
    InvalidSerializationFields,
    /// A field value could not be coerced
    InvalidType,
    /// A field value was rejected by a validator
    ValidatorFailed,
    /// Several field errors collected in one construction
    MultipleErrors,
    /// The schema definition itself is inconsistent
    InvalidDefinition,
    /// Construction input was not a mapping
    NotAMapping,
    /// Registry lookup of an unregistered schema
    UnknownSchema,
    /// Registry already holds a schema under that name
    AlreadyRegistered,
}

impl SchemaErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::UnknownFields => "SCHEMA_UNKNOWN_FIELDS",
            SchemaErrorCode::MissingRequired => "SCHEMA_MISSING_REQUIRED",
            SchemaErrorCode::InvalidSerializationFields => "SCHEMA_INVALID_SERIALIZATION_FIELDS",
            SchemaErrorCode::InvalidType => "SCHEMA_INVALID_TYPE",
            SchemaErrorCode::ValidatorFailed => "SCHEMA_VALIDATOR_FAILED",
            SchemaErrorCode::MultipleErrors => "SCHEMA_MULTIPLE_ERRORS",
            SchemaErrorCode::InvalidDefinition => "SCHEMA_INVALID_DEFINITION",
            SchemaErrorCode::NotAMapping => "SCHEMA_NOT_A_MAPPING",
            SchemaErrorCode::UnknownSchema => "SCHEMA_UNKNOWN_SCHEMA",
            SchemaErrorCode::AlreadyRegistered => "SCHEMA_ALREADY_REGISTERED",
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Record-level schema error
#[derive(Debug, Clone, Error)]
pub enum SchemaError {
    #[error("Invalid attributes {} for {schema}", join(.fields))]
    UnknownFields {
        schema: String,
        fields: BTreeSet<String>,
    },

    #[error("Missing required attributes {} for {schema}", join(.fields))]
    MissingRequired {
        schema: String,
        fields: BTreeSet<String>,
    },

    #[error("Invalid serialization fields {} for {schema}", join(.fields))]
    InvalidSerializationFields {
        schema: String,
        fields: BTreeSet<String>,
    },

    #[error("{schema}.{field}: {source}")]
    Field {
        schema: String,
        field: String,
        #[source]
        source: FieldError,
    },

    #[error("{} errors for {schema}: {}", .errors.len(), join_errors(.errors))]
    Multiple {
        schema: String,
        errors: Vec<SchemaError>,
    },

    #[error("Invalid definition for {schema}: {reason}")]
    InvalidDefinition { schema: String, reason: String },

    #[error("{schema} expects a mapping, got {actual}")]
    NotAMapping { schema: String, actual: String },

    #[error("Schema '{0}' not found")]
    UnknownSchema(String),

    #[error("Schema '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl SchemaError {
    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        match self {
            SchemaError::UnknownFields { .. } => SchemaErrorCode::UnknownFields,
            SchemaError::MissingRequired { .. } => SchemaErrorCode::MissingRequired,
            SchemaError::InvalidSerializationFields { .. } => {
                SchemaErrorCode::InvalidSerializationFields
            }
            SchemaError::Field { source, .. } => match source {
                FieldError::InvalidType(_) => SchemaErrorCode::InvalidType,
                FieldError::ValidatorFailed { .. } => SchemaErrorCode::ValidatorFailed,
            },
            SchemaError::Multiple { .. } => SchemaErrorCode::MultipleErrors,
            SchemaError::InvalidDefinition { .. } => SchemaErrorCode::InvalidDefinition,
            SchemaError::NotAMapping { .. } => SchemaErrorCode::NotAMapping,
            SchemaError::UnknownSchema(_) => SchemaErrorCode::UnknownSchema,
            SchemaError::AlreadyRegistered(_) => SchemaErrorCode::AlreadyRegistered,
        }
    }

    /// Returns the offending field names for structural errors.
    pub fn fields(&self) -> Option<&BTreeSet<String>> {
        match self {
            SchemaError::UnknownFields { fields, .. }
            | SchemaError::MissingRequired { fields, .. }
            | SchemaError::InvalidSerializationFields { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Returns the field-level error for wrapped field failures.
    pub fn field_error(&self) -> Option<&FieldError> {
        match self {
            SchemaError::Field { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the name of the failing field for wrapped field failures.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            SchemaError::Field { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns the validator message for validator failures.
    pub fn validator_message(&self) -> Option<&str> {
        self.field_error().and_then(FieldError::validator_message)
    }

    pub(crate) fn invalid_definition(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::InvalidDefinition {
            schema: schema.into(),
            reason: reason.into(),
        }
    }
}

fn join(fields: &BTreeSet<String>) -> String {
    let names: Vec<&str> = fields.iter().map(String::as_str).collect();
    format!("{{{}}}", names.join(", "))
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {}", reason),
        None => String::new(),
    }
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
