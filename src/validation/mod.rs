use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

mod constraints;
pub mod interceptor;

pub use constraints::ParameterConstraint;
pub use interceptor::ValidationInterceptor;

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstraintViolation {
    pub path: String,
    pub message: String,
}

impl ConstraintViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Violations gathered across the validation passes of one request.
///
/// Keys are field paths or parameter names. Recording a key that is already present
/// replaces its message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    has_errors: bool,
    error_msg: BTreeMap<String, String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_violations(violations: impl IntoIterator<Item = ConstraintViolation>) -> Self {
        let mut result = Self::new();
        for violation in violations {
            result.record(violation.path, violation.message);
        }
        result
    }

    pub fn record(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.error_msg.insert(path.into(), message.into());
        self.has_errors = true;
    }

    /// Fold `other` into `self`; its entries win on duplicate keys.
    pub fn merge(&mut self, other: ValidationResult) {
        if other.has_errors {
            self.error_msg.extend(other.error_msg);
            self.has_errors = true;
        }
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn error_msg(&self) -> &BTreeMap<String, String> {
        &self.error_msg
    }
}

impl fmt::Display for ValidationResult {
    /// `path: message` entries in key order, joined by `"; "`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (path, message)) in self.error_msg.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", path, message)?;
        }
        Ok(())
    }
}

/// Flatten the object-graph errors reported by `validator` into path-keyed
/// violations, sorted by path.
///
/// Nested structs produce dotted paths (`address.city`), list elements an index
/// (`items[0].sku`).
pub fn collect_violations(errors: &ValidationErrors) -> Vec<ConstraintViolation> {
    let mut violations = Vec::new();
    flatten_into(errors, "", &mut violations);
    violations.sort_by(|a, b| a.path.cmp(&b.path));
    violations
}

fn flatten_into(errors: &ValidationErrors, prefix: &str, out: &mut Vec<ConstraintViolation>) {
    for (field, kind) in errors.errors() {
        let path = format!("{}{}", prefix, field);
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                out.extend(
                    field_errors
                        .iter()
                        .map(|error| ConstraintViolation::new(path.clone(), describe(error))),
                );
            }
            ValidationErrorsKind::Struct(nested) => {
                flatten_into(nested, &format!("{}.", path), out);
            }
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten_into(nested, &format!("{}[{}].", path, index), out);
                }
            }
        }
    }
}

/// The error's own message, or a default derived from its code and parameters.
pub fn describe(error: &ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    let param = |name: &str| error.params.get(name).map(display_param);
    match error.code.as_ref() {
        "length" => match (param("min"), param("max"), param("equal")) {
            (_, _, Some(equal)) => format!("length must be {}", equal),
            (Some(min), Some(max), _) => format!("length must be between {} and {}", min, max),
            (Some(min), None, _) => format!("length must be at least {}", min),
            (None, Some(max), _) => format!("length must be at most {}", max),
            _ => "length is invalid".to_string(),
        },
        "range" => match (param("min"), param("max")) {
            (Some(min), Some(max)) => format!("must be between {} and {}", min, max),
            (Some(min), None) => format!("must be greater than or equal to {}", min),
            (None, Some(max)) => format!("must be less than or equal to {}", max),
            _ => "is out of range".to_string(),
        },
        "email" => "must be a well-formed email address".to_string(),
        "url" => "must be a valid URL".to_string(),
        "required" => "must not be null".to_string(),
        "regex" => "has an invalid format".to_string(),
        "must_match" => match param("other") {
            Some(other) => format!("must match {}", other),
            None => "must match".to_string(),
        },
        code => format!("is invalid ({})", code),
    }
}

fn display_param(value: &serde_json::Value) -> Cow<'_, str> {
    match value {
        serde_json::Value::String(text) => Cow::Borrowed(text),
        other => Cow::Owned(other.to_string()),
    }
}
