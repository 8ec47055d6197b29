//! Field descriptors
//!
//! A `Field` binds a coercer, cardinality, required flag, default and an
//! ordered validator list to one named schema attribute. Descriptors are
//! immutable once their schema is built and hold no per-record state.

use std::sync::Arc;

use super::builder::Schema;
use super::errors::{FieldError, InvalidType, ValidatorFailed};
use super::types::{Coercer, FieldKind};
use super::validator::Validator;
use super::value::FieldValue;

/// Field descriptor
#[derive(Debug, Clone)]
pub struct Field {
    /// Attribute name, assigned when the owning schema is built
    name: String,
    coercer: Coercer,
    is_array: bool,
    required: bool,
    default: Option<FieldValue>,
    validators: Vec<Validator>,
}

impl Field {
    /// Creates an optional scalar field with the given coercer.
    pub fn new(coercer: impl Into<Coercer>) -> Self {
        Self {
            name: String::new(),
            coercer: coercer.into(),
            is_array: false,
            required: false,
            default: None,
            validators: Vec::new(),
        }
    }

    pub fn integer() -> Self {
        Self::new(FieldKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    pub fn boolean() -> Self {
        Self::new(FieldKind::Boolean)
    }

    pub fn timestamp() -> Self {
        Self::new(FieldKind::Timestamp)
    }

    pub fn mapping() -> Self {
        Self::new(FieldKind::Mapping)
    }

    /// Creates a field holding a nested record of `schema`.
    pub fn schema(schema: &Arc<Schema>) -> Self {
        Self::new(FieldKind::Schema(Arc::clone(schema)))
    }

    /// Makes this an array field: every element is coerced and validated.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the value read back when the field was not supplied.
    ///
    /// Ignored for required fields.
    pub fn with_default(mut self, default: impl Into<FieldValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Appends a validator; validators run in the order added.
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coercer(&self) -> &Coercer {
        &self.coercer
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// The default value. Never consulted for required fields.
    pub fn default_value(&self) -> Option<&FieldValue> {
        if self.required {
            None
        } else {
            self.default.as_ref()
        }
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    /// Name of the coerced shape, e.g. "float" or "array of float".
    pub fn type_name(&self) -> String {
        if self.is_array {
            format!("array of {}", self.coercer.kind())
        } else {
            self.coercer.kind().type_name()
        }
    }

    /// Coerces a raw value: the value itself for scalars, every element for
    /// arrays. Fails on the first element that fails.
    pub fn coerce_field(&self, raw: &FieldValue) -> Result<FieldValue, InvalidType> {
        if !self.is_array {
            return self.coercer.coerce(raw);
        }

        let items = raw
            .as_array()
            .ok_or_else(|| InvalidType::new(raw, self.type_name()))?;

        items
            .iter()
            .map(|item| self.coercer.coerce(item))
            .collect::<Result<Vec<_>, _>>()
            .map(FieldValue::Array)
    }

    /// Runs validators in declared order; for arrays every element must pass
    /// every validator.
    pub fn validate(&self, value: &FieldValue) -> Result<(), ValidatorFailed> {
        match (self.is_array, value) {
            (true, FieldValue::Array(items)) => {
                items.iter().try_for_each(|item| self.run_validators(item))
            }
            _ => self.run_validators(value),
        }
    }

    /// Coerces then validates, producing the value to store.
    pub fn clean(&self, raw: &FieldValue) -> Result<FieldValue, FieldError> {
        let value = self.coerce_field(raw)?;
        self.validate(&value)
            .map_err(|source| FieldError::ValidatorFailed {
                value: raw.to_string(),
                source,
            })?;
        Ok(value)
    }

    fn run_validators(&self, value: &FieldValue) -> Result<(), ValidatorFailed> {
        self.validators
            .iter()
            .try_for_each(|validator| validator.check(value))
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    pub(crate) fn set_default(&mut self, default: FieldValue) {
        self.default = Some(default);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded_number() -> Field {
        Field::integer()
            .with_validator(Validator::new("must not be negative", |v| {
                v.as_i64().map_or(false, |n| n >= 0)
            }))
            .with_validator(Validator::new("must be below 50", |v| {
                v.as_i64().map_or(false, |n| n < 50)
            }))
            .with_default(40)
    }

    #[test]
    fn test_scalar_clean() {
        let field = bounded_number();
        assert_eq!(field.clean(&10.into()).unwrap(), FieldValue::Integer(10));
        assert_eq!(field.clean(&"10".into()).unwrap(), FieldValue::Integer(10));
    }

    #[test]
    fn test_type_failure() {
        let field = bounded_number();
        let err = field.clean(&"String".into()).unwrap_err();
        assert!(err.invalid_type().is_some());
    }

    #[test]
    fn test_validators_run_in_order() {
        let field = bounded_number();

        let err = field.clean(&(-1).into()).unwrap_err();
        assert_eq!(err.validator_message(), Some("must not be negative"));

        let err = field.clean(&100.into()).unwrap_err();
        assert_eq!(err.validator_message(), Some("must be below 50"));
    }

    #[test]
    fn test_array_coercion() {
        let field = Field::float().array();
        let value = field
            .coerce_field(&FieldValue::Array(vec![1.into(), "2.5".into(), 3.into()]))
            .unwrap();
        assert_eq!(
            value,
            FieldValue::Array(vec![1.0.into(), 2.5.into(), 3.0.into()])
        );

        assert!(field.coerce_field(&vec![FieldValue::from(1), "x".into()].into()).is_err());
    }

    #[test]
    fn test_array_requires_sequence() {
        let field = Field::float().array();
        let err = field.coerce_field(&1.5.into()).unwrap_err();
        assert_eq!(err.target, "array of float");
    }

    #[test]
    fn test_array_validation_is_elementwise() {
        let field = Field::float()
            .array()
            .with_validator(Validator::range(0.0, 5.0));

        assert!(field.clean(&vec![0.34, 4.9].into()).is_ok());
        let err = field.clean(&vec![0.34, 5.5].into()).unwrap_err();
        assert!(err.validator_message().is_some());
    }

    #[test]
    fn test_required_field_ignores_default() {
        let field = Field::string().with_default("this").required();
        assert!(field.is_required());
        assert!(field.default_value().is_none());

        let optional = Field::string().with_default("this");
        assert_eq!(optional.default_value(), Some(&FieldValue::from("this")));
    }
}
