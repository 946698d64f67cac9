use crate::error::WheelError;
use axum::response::Response;
use std::error::Error;
use std::sync::Arc;

mod context;
mod error_code;
pub mod http;
pub mod layer;

pub use context::RequestContext;
pub use error_code::ErrorCode;
pub use http::HttpExceptionFilter;
pub use layer::{ExceptionLayer, ExceptionMiddleware};

/// Domain error raised intentionally by business logic.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct ApiException {
    error_code: ErrorCode,
    message: String,
}

impl ApiException {
    pub fn new(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code,
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Constraint violations found before a handler ran. Always classified as
/// [`ErrorCode::BAD_REQUEST`].
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct ParamCheckException(ApiException);

impl ParamCheckException {
    pub fn new(message: impl Into<String>) -> Self {
        Self(ApiException::new(ErrorCode::BAD_REQUEST, message))
    }

    pub fn error_code(&self) -> ErrorCode {
        self.0.error_code()
    }

    pub fn message(&self) -> &str {
        self.0.message()
    }
}

impl From<ParamCheckException> for ApiException {
    fn from(value: ParamCheckException) -> Self {
        value.0
    }
}

/// Response extension carrying an error that escaped the handler chain, so that the
/// [`ExceptionLayer`] can translate it with request context.
#[derive(Debug, Clone)]
pub struct EscapedError(Arc<WheelError>);

impl EscapedError {
    pub(crate) fn new(error: WheelError) -> Self {
        Self(Arc::new(error))
    }

    pub fn error(&self) -> &WheelError {
        &self.0
    }
}

/// Response extension set on 500-class error responses, exposing the error text to
/// downstream diagnostics (the response body never carries it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorAttribute {
    pub exception: String,
}

/// The ExceptionFilter trait
///
/// Filters turn errors escaping request processing into responses. They must not
/// fail: every path returns a valid response.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Translate an error raised by a handler or interceptor.
    fn catch(&self, error: &WheelError, context: &RequestContext) -> Response;

    /// Observe an error response the framework produced on its own (extractor
    /// rejections, unmatched routes) and return the response to send.
    fn catch_internal(
        &self,
        error: &(dyn Error + 'static),
        response: Response,
        context: &RequestContext,
    ) -> Response;
}
