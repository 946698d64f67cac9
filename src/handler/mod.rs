//! Handler metadata
//!
//! Handlers declare their parameters explicitly at registration time: where each
//! value comes from, its type, and the constraints it must satisfy. The validation
//! interceptor works entirely from this description.

use crate::validation::ParameterConstraint;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use serde::de::DeserializeOwned;
use validator::Validate;

mod argument;

pub use argument::{ArgumentValue, ParameterType, ResolvedArguments};
pub(crate) use argument::Decoder;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Where a parameter's value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum ParameterKind {
    #[strum(serialize = "path variable")]
    PathVariable,
    #[strum(serialize = "request parameter")]
    RequestParam,
    #[strum(serialize = "request header")]
    RequestHeader,
    #[strum(serialize = "request body")]
    RequestBody,
    /// Supplied by a custom resolver.
    #[strum(serialize = "custom argument")]
    Custom,
}

/// One declared handler parameter.
#[derive(Debug, Clone)]
pub struct MethodParameter {
    index: usize,
    name: String,
    kind: ParameterKind,
    parameter_type: ParameterType,
    required: bool,
    constraints: Vec<ParameterConstraint>,
}

impl MethodParameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind, parameter_type: ParameterType) -> Self {
        Self {
            index: 0,
            name: name.into(),
            kind,
            parameter_type,
            required: true,
            constraints: Vec::new(),
        }
    }

    pub fn path<T>(name: impl Into<String>) -> Self
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: fmt::Display,
    {
        Self::new(name, ParameterKind::PathVariable, ParameterType::text::<T>())
    }

    pub fn query<T>(name: impl Into<String>) -> Self
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: fmt::Display,
    {
        Self::new(name, ParameterKind::RequestParam, ParameterType::text::<T>())
    }

    pub fn header<T>(name: impl Into<String>) -> Self
    where
        T: FromStr + Send + Sync + 'static,
        T::Err: fmt::Display,
    {
        Self::new(name, ParameterKind::RequestHeader, ParameterType::text::<T>())
    }

    /// A JSON body whose object graph is validated.
    pub fn body<T>(name: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Validate + Send + Sync + 'static,
    {
        Self::new(name, ParameterKind::RequestBody, ParameterType::validated::<T>())
    }

    /// Absent values resolve to `None` instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Add a method-level constraint.
    pub fn constraint(mut self, constraint: ParameterConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn parameter_type(&self) -> &ParameterType {
        &self.parameter_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn constraints(&self) -> &[ParameterConstraint] {
        &self.constraints
    }
}

/// A routed handler: the controller it belongs to, its name, and its parameters.
///
/// # Example
/// ```
/// use springwheel::handler::{HandlerMethod, MethodParameter};
/// use springwheel::validation::ParameterConstraint;
///
/// struct WidgetController;
///
/// let handler = HandlerMethod::of::<WidgetController>("search")
///     .param(MethodParameter::query::<String>("q").constraint(ParameterConstraint::NotBlank))
///     .param(MethodParameter::query::<u32>("limit").optional())
///     .param_check();
/// assert!(handler.requires_validation());
/// assert_eq!(handler.parameters()[1].index(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct HandlerMethod {
    id: HandlerId,
    bean_type: &'static str,
    method_name: &'static str,
    parameters: Vec<MethodParameter>,
    param_check: bool,
}

impl HandlerMethod {
    pub fn new(bean_type: &'static str, method_name: &'static str) -> Self {
        Self {
            id: HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed)),
            bean_type,
            method_name,
            parameters: Vec::new(),
            param_check: false,
        }
    }

    /// A handler on controller type `C`.
    pub fn of<C: ?Sized + 'static>(method_name: &'static str) -> Self {
        Self::new(std::any::type_name::<C>(), method_name)
    }

    /// Declare the next parameter; positions follow declaration order.
    pub fn param(mut self, mut parameter: MethodParameter) -> Self {
        parameter.index = self.parameters.len();
        self.parameters.push(parameter);
        self
    }

    /// Mark the handler as requiring validation before it runs.
    pub fn param_check(mut self) -> Self {
        self.param_check = true;
        self
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn bean_type(&self) -> &'static str {
        self.bean_type
    }

    pub fn method_name(&self) -> &'static str {
        self.method_name
    }

    pub fn parameters(&self) -> &[MethodParameter] {
        &self.parameters
    }

    pub fn requires_validation(&self) -> bool {
        self.param_check
    }
}

impl fmt::Display for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.bean_type, self.method_name)
    }
}
