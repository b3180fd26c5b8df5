//! Declarative field validation.
//!
//! A field's `validate` tag is a comma-separated rule list such as `required,min=3`. Rules run
//! left to right and the first failure is reported for that field. Built-in rules:
//!
//! | rule | passes when |
//! |------|-------------|
//! | `required` | the value is not its zero value |
//! | `omitempty` | always; skips the remaining rules for zero values |
//! | `min=N` / `max=N` | length (text, bytes, collections) or number is within bounds |
//! | `len=N` | length or number equals `N` |
//! | `oneof=a b c` | text or number equals one of the listed words |
//!
//! Absent optional fields pass every rule except `required`. Request types that need more
//! register custom rules on the [`Validator`] returned by their validator factory.

use crate::error::ValidationError;
use crate::field::FieldValue;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A custom rule: receives the field view and the rule parameter, if any.
pub type RuleFn = Arc<dyn Fn(&FieldValue<'_>, Option<&str>) -> bool + Send + Sync>;

/// Runs validation rules against field values.
#[derive(Clone, Default)]
pub struct Validator {
    rules: HashMap<String, RuleFn>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Validator").field("custom_rules", &names).finish()
    }
}

impl Validator {
    /// A validator with only the built-in rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom rule, replacing any rule of the same name.
    #[must_use]
    pub fn with_rule<F>(mut self, name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&FieldValue<'_>, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.register(name, rule);
        self
    }

    /// Register a custom rule in place.
    pub fn register<F>(&mut self, name: impl Into<String>, rule: F)
    where
        F: Fn(&FieldValue<'_>, Option<&str>) -> bool + Send + Sync + 'static,
    {
        self.rules.insert(name.into(), Arc::new(rule));
    }

    /// Check `value` against the rule list `rules`.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule for `field`, or [`ValidationError::UndefinedRule`] when
    /// a rule name is unknown.
    pub fn validate_field(
        &self,
        field: &str,
        rules: &str,
        value: &FieldValue<'_>,
    ) -> Result<(), ValidationError> {
        for rule in rules.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            let (name, param) = match rule.split_once('=') {
                Some((name, param)) => (name.trim(), Some(param.trim())),
                None => (rule, None),
            };

            if let Some(custom) = self.rules.get(name) {
                if custom(value, param) {
                    continue;
                }
                return Err(failed(field, name));
            }

            if name == "omitempty" {
                if value.is_zero() {
                    return Ok(());
                }
                continue;
            }
            if name == "required" {
                if value.is_zero() {
                    return Err(failed(field, name));
                }
                continue;
            }
            if matches!(value, FieldValue::Absent) {
                if is_builtin(name) {
                    continue;
                }
                return Err(undefined(field, name));
            }

            let passed = match name {
                "min" => compare(field, name, param, value, |actual, bound| actual >= bound)?,
                "max" => compare(field, name, param, value, |actual, bound| actual <= bound)?,
                "len" => compare(field, name, param, value, |actual, bound| {
                    (actual - bound).abs() < f64::EPSILON
                })?,
                "oneof" => one_of(value, param.unwrap_or_default()),
                _ => return Err(undefined(field, name)),
            };
            if !passed {
                return Err(failed(field, name));
            }
        }
        Ok(())
    }
}

fn is_builtin(name: &str) -> bool {
    matches!(name, "min" | "max" | "len" | "oneof")
}

fn failed(field: &str, rule: &str) -> ValidationError {
    ValidationError::Rule {
        field: field.to_string(),
        rule: rule.to_string(),
    }
}

fn undefined(field: &str, rule: &str) -> ValidationError {
    ValidationError::UndefinedRule {
        field: field.to_string(),
        rule: rule.to_string(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare(
    field: &str,
    rule: &str,
    param: Option<&str>,
    value: &FieldValue<'_>,
    check: impl Fn(f64, f64) -> bool,
) -> Result<bool, ValidationError> {
    let bound: f64 = param
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| ValidationError::InvalidParameter {
            field: field.to_string(),
            rule: rule.to_string(),
            param: param.unwrap_or_default().to_string(),
        })?;
    let actual = value
        .length()
        .map(|len| len as f64)
        .or_else(|| value.number());
    Ok(actual.is_some_and(|actual| check(actual, bound)))
}

fn one_of(value: &FieldValue<'_>, options: &str) -> bool {
    let actual = match *value {
        FieldValue::Text(text) => text.to_string(),
        FieldValue::Int(n) => n.to_string(),
        FieldValue::UInt(n) => n.to_string(),
        _ => return false,
    };
    options.split_whitespace().any(|option| option == actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Inspect;

    #[test]
    fn test_required() {
        let validator = Validator::new();
        assert!(validator.validate_field("name", "required", &"x".inspect()).is_ok());
        assert_eq!(
            validator.validate_field("name", "required", &"".inspect()),
            Err(ValidationError::Rule {
                field: "name".into(),
                rule: "required".into()
            })
        );
        assert!(validator
            .validate_field("name", "required", &Inspect::inspect(&Option::<String>::None))
            .is_err());
    }

    #[test]
    fn test_min_max_on_text_and_numbers() {
        let validator = Validator::new();
        assert!(validator.validate_field("s", "min=2,max=4", &"abc".inspect()).is_ok());
        assert!(validator.validate_field("s", "min=2", &"a".inspect()).is_err());
        assert!(validator.validate_field("n", "max=10", &11_i32.inspect()).is_err());
        assert!(validator.validate_field("n", "min=1", &1_u8.inspect()).is_ok());
        assert!(validator.validate_field("v", "len=2", &vec![1, 2].inspect()).is_ok());
    }

    #[test]
    fn test_omitempty_skips_zero_values() {
        let validator = Validator::new();
        assert!(validator.validate_field("s", "omitempty,min=3", &"".inspect()).is_ok());
        assert!(validator.validate_field("s", "omitempty,min=3", &"ab".inspect()).is_err());
    }

    #[test]
    fn test_absent_optional_passes_size_rules() {
        let validator = Validator::new();
        assert!(validator
            .validate_field("s", "min=3", &Inspect::inspect(&Option::<String>::None))
            .is_ok());
    }

    #[test]
    fn test_oneof() {
        let validator = Validator::new();
        assert!(validator.validate_field("c", "oneof=red green", &"red".inspect()).is_ok());
        assert!(validator.validate_field("c", "oneof=red green", &"blue".inspect()).is_err());
        assert!(validator.validate_field("n", "oneof=1 2", &2_i64.inspect()).is_ok());
    }

    #[test]
    fn test_undefined_and_invalid_parameter() {
        let validator = Validator::new();
        assert!(matches!(
            validator.validate_field("s", "email", &"x".inspect()),
            Err(ValidationError::UndefinedRule { .. })
        ));
        assert!(matches!(
            validator.validate_field("s", "min=abc", &"x".inspect()),
            Err(ValidationError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_custom_rule() {
        let validator = Validator::new().with_rule("even", |value, _| {
            matches!(value, FieldValue::Int(n) if n % 2 == 0)
        });
        assert!(validator.validate_field("n", "even", &4_i32.inspect()).is_ok());
        assert!(validator.validate_field("n", "even", &3_i32.inspect()).is_err());
        assert!(Validator::new().validate_field("n", "even", &4_i32.inspect()).is_err());
    }
}
