use crate::common::response::RenderedErrorResult;
use crate::config::WebConfig;
use crate::exception::{EscapedError, ExceptionFilter, HttpExceptionFilter, RequestContext};
use axum::{
    body::{Body, HttpBody},
    http::{Request, StatusCode},
    response::Response,
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Upper bound on a framework error body read back for logging.
const FRAMEWORK_BODY_LIMIT: usize = 64 * 1024;

/// Tower Layer applying an [`ExceptionFilter`] to everything leaving a router
///
/// Install it as the outermost layer of the application router:
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use springwheel::exception::ExceptionLayer;
///
/// let app: Router = Router::new()
///     .route("/health", get(|| async { "ok" }))
///     .layer(ExceptionLayer::default());
/// ```
#[derive(Clone)]
pub struct ExceptionLayer {
    filter: Arc<dyn ExceptionFilter>,
    log_framework_errors: bool,
}

impl ExceptionLayer {
    pub fn new(filter: impl ExceptionFilter) -> Self {
        Self {
            filter: Arc::new(filter),
            log_framework_errors: true,
        }
    }

    pub fn from_config(filter: impl ExceptionFilter, config: &WebConfig) -> Self {
        Self::new(filter).log_framework_errors(config.log_framework_errors)
    }

    /// Whether error responses produced by the framework itself are logged.
    pub fn log_framework_errors(mut self, enabled: bool) -> Self {
        self.log_framework_errors = enabled;
        self
    }
}

impl Default for ExceptionLayer {
    fn default() -> Self {
        Self::new(HttpExceptionFilter)
    }
}

impl<S> Layer<S> for ExceptionLayer {
    type Service = ExceptionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ExceptionMiddleware {
            inner,
            filter: self.filter.clone(),
            log_framework_errors: self.log_framework_errors,
        }
    }
}

#[derive(Clone)]
pub struct ExceptionMiddleware<S> {
    inner: S,
    filter: Arc<dyn ExceptionFilter>,
    log_framework_errors: bool,
}

impl<S> Service<Request<Body>> for ExceptionMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let context = RequestContext::from_request(&request);
        let filter = self.filter.clone();
        let log_framework_errors = self.log_framework_errors;
        // The clone has not been polled for readiness; keep the ready one for this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = inner.call(request).await?;

            if let Some(escaped) = response.extensions().get::<EscapedError>().cloned() {
                return Ok(filter.catch(escaped.error(), &context));
            }

            let status = response.status();
            let produced_by_framework = (status.is_client_error() || status.is_server_error())
                && response.extensions().get::<RenderedErrorResult>().is_none();
            if log_framework_errors && produced_by_framework {
                return Ok(catch_framework_error(filter.as_ref(), response, &context).await);
            }

            Ok(response)
        })
    }
}

/// An error response that did not come from a handler error, described by its
/// status and body text.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FrameworkError {
    pub status: StatusCode,
    pub message: String,
}

async fn catch_framework_error(
    filter: &dyn ExceptionFilter,
    response: Response,
    context: &RequestContext,
) -> Response {
    let (parts, body) = response.into_parts();
    let fallback = parts
        .status
        .canonical_reason()
        .unwrap_or("Unknown Error")
        .to_string();

    // Bodies of unknown or excessive size are forwarded untouched and described by
    // their status alone.
    let readable = body
        .size_hint()
        .upper()
        .is_some_and(|len| len <= FRAMEWORK_BODY_LIMIT as u64);
    if !readable {
        let error = FrameworkError {
            status: parts.status,
            message: fallback,
        };
        return filter.catch_internal(&error, Response::from_parts(parts, body), context);
    }

    let (message, body) = match axum::body::to_bytes(body, FRAMEWORK_BODY_LIMIT).await {
        Ok(bytes) => {
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            let message = if text.is_empty() { fallback } else { text };
            (message, Body::from(bytes))
        }
        Err(e) => {
            tracing::warn!("Failed to read {} response body: {}", parts.status, e);
            (fallback, Body::empty())
        }
    };
    let error = FrameworkError {
        status: parts.status,
        message,
    };

    filter.catch_internal(&error, Response::from_parts(parts, body), context)
}
