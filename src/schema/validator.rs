//! Field validators
//!
//! A validator is an explicit (predicate, message) pair. Validators run after
//! coercion, in declared order, and the first predicate returning false
//! rejects the value with its message.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use super::errors::ValidatorFailed;
use super::value::FieldValue;

type Predicate = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

/// A named predicate over coerced field values.
#[derive(Clone)]
pub struct Validator {
    description: String,
    message: Option<String>,
    predicate: Predicate,
}

impl Validator {
    /// Creates a validator from a description and a predicate.
    ///
    /// The description doubles as the failure message unless
    /// [`Validator::with_message`] sets one.
    pub fn new<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FieldValue) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            message: None,
            predicate: Arc::new(predicate),
        }
    }

    /// Sets a custom failure message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Message reported on failure: the custom message, else the description.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.description)
    }

    /// Evaluates the predicate.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        (self.predicate)(value)
    }

    /// Evaluates the predicate, producing the failure on rejection.
    pub fn check(&self, value: &FieldValue) -> Result<(), ValidatorFailed> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(ValidatorFailed::new(self.message()))
        }
    }

    /// Numeric value within `[min, max]`.
    pub fn range(min: f64, max: f64) -> Self {
        Self::new(format!("value must be between {} and {}", min, max), move |v| {
            v.as_f64().map_or(false, |n| min <= n && n <= max)
        })
    }

    /// Numeric value at least `min`.
    pub fn min(min: f64) -> Self {
        Self::new(format!("value must be at least {}", min), move |v| {
            v.as_f64().map_or(false, |n| n >= min)
        })
    }

    /// Numeric value at most `max`.
    pub fn max(max: f64) -> Self {
        Self::new(format!("value must be at most {}", max), move |v| {
            v.as_f64().map_or(false, |n| n <= max)
        })
    }

    /// Value equal to one of the allowed values.
    pub fn one_of<I, V>(allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        let allowed: Vec<FieldValue> = allowed.into_iter().map(Into::into).collect();
        let listing = allowed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Self::new(format!("value must be one of [{}]", listing), move |v| {
            allowed.contains(v)
        })
    }

    /// String matching a regular expression.
    ///
    /// The pattern is compiled once, here.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(pattern)?;
        Ok(Self::new(format!("value must match /{}/", pattern), move |v| {
            v.as_str().map_or(false, |s| re.is_match(s))
        }))
    }

    /// Length of a string (in chars), array or mapping within `[min, max]`.
    pub fn length(min: usize, max: usize) -> Self {
        Self::new(format!("length must be between {} and {}", min, max), move |v| {
            value_len(v).map_or(false, |len| min <= len && len <= max)
        })
    }

    /// Non-empty string, array or mapping.
    pub fn non_empty() -> Self {
        Self::new("value must not be empty", |v| {
            value_len(v).map_or(false, |len| len > 0)
        })
    }
}

fn value_len(value: &FieldValue) -> Option<usize> {
    match value {
        FieldValue::String(s) => Some(s.chars().count()),
        FieldValue::Array(items) => Some(items.len()),
        FieldValue::Mapping(map) => Some(map.len()),
        _ => None,
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("description", &self.description)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_message_wins() {
        let validator = Validator::new("age in range", |v| {
            v.as_i64().map_or(false, |age| (18..=30).contains(&age))
        })
        .with_message("Age must be between 18 and 30.");

        assert!(validator.check(&FieldValue::Integer(20)).is_ok());
        let err = validator.check(&FieldValue::Integer(99)).unwrap_err();
        assert_eq!(err.message, "Age must be between 18 and 30.");
    }

    #[test]
    fn test_description_is_fallback_message() {
        let validator = Validator::new("must be positive", |v| {
            v.as_f64().map_or(false, |n| n > 0.0)
        });
        let err = validator.check(&FieldValue::Float(-1.0)).unwrap_err();
        assert_eq!(err.message, "must be positive");
    }

    #[test]
    fn test_range() {
        let validator = Validator::range(0.0, 5.0);
        assert!(validator.accepts(&FieldValue::Float(0.34)));
        assert!(validator.accepts(&FieldValue::Integer(5)));
        assert!(!validator.accepts(&FieldValue::Float(5.1)));
        assert!(!validator.accepts(&FieldValue::from("3")));
    }

    #[test]
    fn test_one_of() {
        let validator = Validator::one_of(["overview", "detailed"]);
        assert!(validator.accepts(&FieldValue::from("overview")));
        assert!(!validator.accepts(&FieldValue::from("thumbnail")));
        assert!(validator.message().contains("overview"));
    }

    #[test]
    fn test_pattern() {
        let validator = Validator::pattern(r"^[a-z]+$").unwrap();
        assert!(validator.accepts(&FieldValue::from("rust")));
        assert!(!validator.accepts(&FieldValue::from("Rust")));
        assert!(!validator.accepts(&FieldValue::Integer(1)));

        assert!(Validator::pattern("(unclosed").is_err());
    }

    #[test]
    fn test_length_and_non_empty() {
        let validator = Validator::length(1, 3);
        assert!(validator.accepts(&FieldValue::from("ab")));
        assert!(validator.accepts(&FieldValue::from(vec![1, 2, 3])));
        assert!(!validator.accepts(&FieldValue::from("abcd")));

        let non_empty = Validator::non_empty();
        assert!(!non_empty.accepts(&FieldValue::from("")));
        assert!(non_empty.accepts(&FieldValue::from("x")));
    }
}
