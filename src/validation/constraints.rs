use crate::handler::ArgumentValue;
use regex::Regex;
use serde_json::Value;
use validator::ValidateEmail;

/// A method-level constraint on one handler parameter.
///
/// Apart from `NotNull` and `NotBlank`, an absent value satisfies every constraint.
#[derive(Debug, Clone)]
pub enum ParameterConstraint {
    NotNull,
    /// Present and not only whitespace.
    NotBlank,
    /// Character count of a textual value.
    Length { min: Option<u64>, max: Option<u64> },
    /// Numeric value, from a JSON number or numeric text. NaN is always out of range.
    Range { min: Option<f64>, max: Option<f64> },
    Email,
    /// The whole value must match.
    Pattern(Regex),
}

impl ParameterConstraint {
    pub fn length(min: u64, max: u64) -> Self {
        Self::Length {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Anchors `pattern` so it must match the entire value.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("^(?:{})$", pattern)).map(Self::Pattern)
    }

    /// Returns the violation message, or `None` when the value satisfies the constraint.
    pub fn check(&self, value: Option<&ArgumentValue>) -> Option<String> {
        let raw = value.map(ArgumentValue::raw).filter(|raw| !raw.is_null());

        match (self, raw) {
            (Self::NotNull, None) => Some("must not be null".to_string()),
            (Self::NotBlank, None) => Some("must not be blank".to_string()),
            (_, None) => None,
            (Self::NotNull, Some(_)) => None,
            (Self::NotBlank, Some(raw)) => match raw {
                Value::String(text) if text.trim().is_empty() => {
                    Some("must not be blank".to_string())
                }
                _ => None,
            },
            (Self::Length { min, max }, Some(Value::String(text))) => {
                let length = text.chars().count() as u64;
                let too_short = min.is_some_and(|min| length < min);
                let too_long = max.is_some_and(|max| length > max);
                (too_short || too_long).then(|| length_message(*min, *max))
            }
            (Self::Range { min, max }, Some(raw)) => {
                let number = match raw {
                    Value::Number(number) => number.as_f64(),
                    Value::String(text) => text.trim().parse::<f64>().ok(),
                    _ => None,
                }?;
                // NaN compares false against every bound.
                let below = number.is_nan() || min.is_some_and(|min| number < min);
                let above = max.is_some_and(|max| number > max);
                (below || above).then(|| range_message(*min, *max))
            }
            (Self::Email, Some(Value::String(text))) => (!text.validate_email())
                .then(|| "must be a well-formed email address".to_string()),
            (Self::Pattern(regex), Some(Value::String(text))) => {
                (!regex.is_match(text)).then(|| format!("must match \"{}\"", regex.as_str()))
            }
            _ => None,
        }
    }
}

fn length_message(min: Option<u64>, max: Option<u64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("length must be between {} and {}", min, max),
        (Some(min), None) => format!("length must be at least {}", min),
        (None, Some(max)) => format!("length must be at most {}", max),
        (None, None) => "length is invalid".to_string(),
    }
}

fn range_message(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("must be between {} and {}", min, max),
        (Some(min), None) => format!("must be greater than or equal to {}", min),
        (None, Some(max)) => format!("must be less than or equal to {}", max),
        (None, None) => "is out of range".to_string(),
    }
}
