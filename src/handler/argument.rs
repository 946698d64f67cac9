use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

type ValidateFn = fn(&(dyn Any + Send + Sync)) -> Result<(), ValidationErrors>;

/// How a raw request value becomes a typed argument.
#[derive(Clone, Copy)]
pub(crate) enum Decoder {
    /// Single textual value: path variable, query parameter, header.
    Text(fn(&str) -> Result<ArgumentValue, String>),
    /// JSON document: request body.
    Json(fn(Value) -> Result<ArgumentValue, String>),
}

/// The declared Rust type of a handler parameter.
#[derive(Clone, Copy)]
pub struct ParameterType {
    type_name: &'static str,
    pub(crate) decoder: Decoder,
}

impl ParameterType {
    /// A type parsed from text with [`FromStr`].
    pub fn text<T>() -> Self
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: fmt::Display,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            decoder: Decoder::Text(decode_text::<T>),
        }
    }

    /// A JSON type without constraints of its own.
    pub fn json<T>() -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            decoder: Decoder::Json(decode_json::<T>),
        }
    }

    /// A JSON type whose object graph is validated with [`Validate`].
    pub fn validated<T>() -> Self
    where
        T: DeserializeOwned + Validate + Send + Sync + 'static,
    {
        Self {
            type_name: std::any::type_name::<T>(),
            decoder: Decoder::Json(decode_validated::<T>),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_text(&self) -> bool {
        matches!(self.decoder, Decoder::Text(_))
    }

    pub fn is_json(&self) -> bool {
        matches!(self.decoder, Decoder::Json(_))
    }
}

impl fmt::Debug for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoder = match self.decoder {
            Decoder::Text(_) => "text",
            Decoder::Json(_) => "json",
        };
        f.debug_struct("ParameterType")
            .field("type_name", &self.type_name)
            .field("decoder", &decoder)
            .finish()
    }
}

fn decode_text<T>(raw: &str) -> Result<ArgumentValue, String>
where
    T: FromStr + Send + Sync + 'static,
    T::Err: fmt::Display,
{
    let value = raw.parse::<T>().map_err(|e| e.to_string())?;
    Ok(ArgumentValue::new(value, Value::String(raw.to_string()), None))
}

fn decode_json<T>(raw: Value) -> Result<ArgumentValue, String>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    let value = T::deserialize(&raw).map_err(|e| e.to_string())?;
    Ok(ArgumentValue::new(value, raw, None))
}

fn decode_validated<T>(raw: Value) -> Result<ArgumentValue, String>
where
    T: DeserializeOwned + Validate + Send + Sync + 'static,
{
    let value = T::deserialize(&raw).map_err(|e| e.to_string())?;
    Ok(ArgumentValue::new(value, raw, Some(validate_as::<T>)))
}

fn validate_as<T: Validate + 'static>(value: &(dyn Any + Send + Sync)) -> Result<(), ValidationErrors> {
    match value.downcast_ref::<T>() {
        Some(value) => value.validate(),
        None => Ok(()),
    }
}

/// A resolved handler argument: the typed value plus the raw form it came from.
#[derive(Clone)]
pub struct ArgumentValue {
    value: Arc<dyn Any + Send + Sync>,
    raw: Value,
    validate: Option<ValidateFn>,
    type_name: &'static str,
}

impl ArgumentValue {
    fn new<T: Send + Sync + 'static>(value: T, raw: Value, validate: Option<ValidateFn>) -> Self {
        Self {
            value: Arc::new(value),
            raw,
            validate,
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wrap a value produced by a custom resolver.
    pub fn custom<T: Send + Sync + 'static>(value: T, raw: Value) -> Self {
        Self::new(value, raw, None)
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// The value as it appeared in the request (a JSON string for textual values).
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Object-graph validation; values without constraints always pass.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self.validate {
            Some(validate) => validate(self.value.as_ref()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentValue")
            .field("type_name", &self.type_name)
            .field("raw", &self.raw)
            .finish()
    }
}

/// Arguments resolved by the validation interceptor, in declaration order.
///
/// Inserted as a request extension once validation accepts the request, so handlers
/// can reuse them through `Extension<ResolvedArguments>`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedArguments {
    names: Vec<String>,
    values: Vec<Option<ArgumentValue>>,
}

impl ResolvedArguments {
    pub fn new(names: Vec<String>, values: Vec<Option<ArgumentValue>>) -> Self {
        Self { names, values }
    }

    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        let index = self.names.iter().position(|n| n == name)?;
        self.values.get(index)?.as_ref()?.downcast_ref::<T>()
    }

    pub fn values(&self) -> &[Option<ArgumentValue>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
