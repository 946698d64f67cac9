//! Argument resolution
//!
//! An [`ArgumentResolver`] produces one handler argument from the request. The
//! [`ResolverRegistry`] picks the first resolver supporting each declared parameter
//! and remembers the choice per (handler, position) for the life of the process.

use crate::binder::DataBinder;
use crate::handler::{ArgumentValue, HandlerId, HandlerMethod, MethodParameter, ParameterKind};
use axum::body::Bytes;
use axum::extract::Query;
use axum::http::{HeaderMap, Method, StatusCode, Uri, request::Parts};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

pub mod builtins;

pub use builtins::{
    PathVariableResolver, RequestBodyResolver, RequestHeaderResolver, RequestParamResolver,
};

/// Request-level failure while producing an argument.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolveError {
    #[error("Required {kind} '{name}' is not present")]
    MissingParameter { kind: ParameterKind, name: String },

    #[error("Failed to convert {kind} '{name}' to required type '{type_name}': {reason}")]
    TypeMismatch {
        kind: ParameterKind,
        name: String,
        type_name: &'static str,
        reason: String,
    },

    #[error("Malformed request body: {0}")]
    UnreadableBody(String),
}

impl ResolveError {
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

/// The request as seen by resolvers: head, buffered body, matched path variables.
pub struct WebRequest<'a> {
    parts: &'a Parts,
    body: &'a Bytes,
    path_params: &'a [(String, String)],
    query: HashMap<String, String>,
}

impl<'a> WebRequest<'a> {
    pub fn new(parts: &'a Parts, body: &'a Bytes, path_params: &'a [(String, String)]) -> Self {
        // A query string that does not parse exposes no parameters.
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();
        Self {
            parts,
            body,
            path_params,
            query,
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    pub fn path_variable(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// First value of header `name`; values that are not visible ASCII count as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        self.body
    }
}

/// Produces one handler argument from the request.
pub trait ArgumentResolver: Send + Sync + 'static {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool;

    /// `Ok(None)` is an absent optional argument.
    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        request: &WebRequest<'_>,
        binder: &DataBinder,
    ) -> Result<Option<ArgumentValue>, ResolveError>;
}

type ParameterKey = (HandlerId, usize);

/// Ordered resolvers plus the (handler, position) → resolver cache.
///
/// Cache entries are never evicted; the key space is bounded by the registered
/// handlers' parameters.
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn ArgumentResolver>>,
    cache: DashMap<ParameterKey, Arc<dyn ArgumentResolver>>,
}

impl ResolverRegistry {
    /// No resolvers at all.
    pub fn empty() -> Self {
        Self {
            resolvers: Vec::new(),
            cache: DashMap::with_capacity(256),
        }
    }

    /// The built-in resolvers: path variable, request parameter, header, body.
    pub fn with_defaults() -> Self {
        Self::empty()
            .add(PathVariableResolver)
            .add(RequestParamResolver)
            .add(RequestHeaderResolver)
            .add(RequestBodyResolver)
    }

    /// Append a resolver; earlier resolvers take precedence.
    pub fn add(mut self, resolver: impl ArgumentResolver) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self.cache.clear();
        self
    }

    /// The resolver for `parameter` of `handler`, looked up once and cached.
    pub fn get_argument_resolver(
        &self,
        handler: &HandlerMethod,
        parameter: &MethodParameter,
    ) -> Option<Arc<dyn ArgumentResolver>> {
        let key = (handler.id(), parameter.index());
        if let Some(hit) = self.cache.get(&key) {
            return Some(hit.clone());
        }

        let found = self
            .resolvers
            .iter()
            .find(|resolver| {
                tracing::trace!(
                    "Testing if an argument resolver supports {} '{}' of {}",
                    parameter.kind(),
                    parameter.name(),
                    handler
                );
                resolver.supports_parameter(parameter)
            })?
            .clone();
        // Concurrent first lookups may both search; the first insert wins.
        Some(self.cache.entry(key).or_insert(found).clone())
    }

    /// Number of cached (handler, position) entries.
    pub fn cached_parameters(&self) -> usize {
        self.cache.len()
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
