use crate::error::WheelError;
use crate::handler::HandlerMethod;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode, Uri},
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

pub mod layer;
pub mod logging;

pub use layer::{InterceptorLayer, InterceptorMiddleware};
pub use logging::LoggingInterceptor;

/// What the completion hooks know about the request after its body moved on.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub started: Instant,
}

impl RequestHead {
    pub fn from_request(request: &Request<Body>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            started: Instant::now(),
        }
    }
}

/// The HandlerInterceptor trait
///
/// Interceptors run around one routed handler:
/// - `pre_handle` runs in registration order before the handler and may reject the
///   request by returning an error (the handler then never runs);
/// - `post_handle` runs in reverse order after the handler produced a response;
/// - `after_completion` runs in reverse order for every interceptor whose
///   `pre_handle` succeeded, whether or not the request was rejected. It sees the
///   final status only; the response body is not `Sync` and cannot be shared
///   across the hook's future.
///
/// # Example
/// ```
/// use springwheel::prelude::*;
/// use springwheel::exception::ErrorCode;
/// use springwheel::handler::HandlerMethod;
/// use axum::{body::Body, http::Request};
///
/// struct RequireTenant;
///
/// #[async_trait]
/// impl HandlerInterceptor for RequireTenant {
///     async fn pre_handle(
///         &self,
///         request: Request<Body>,
///         _handler: &HandlerMethod,
///     ) -> Result<Request<Body>, WheelError> {
///         if request.headers().contains_key("x-tenant") {
///             Ok(request)
///         } else {
///             Err(ApiException::new(ErrorCode::UNAUTHORIZED, "missing tenant").into())
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait HandlerInterceptor: Send + Sync + 'static {
    /// Called when a handler is registered behind this interceptor.
    fn on_register(&self, _handler: &HandlerMethod) -> Result<(), WheelError> {
        Ok(())
    }

    async fn pre_handle(
        &self,
        request: Request<Body>,
        _handler: &HandlerMethod,
    ) -> Result<Request<Body>, WheelError> {
        Ok(request)
    }

    async fn post_handle(
        &self,
        _response: &mut Response,
        _handler: &HandlerMethod,
    ) -> Result<(), WheelError> {
        Ok(())
    }

    async fn after_completion(&self, _head: &RequestHead, _status: StatusCode, _handler: &HandlerMethod) {}
}

/// The application's interceptors, shared by every route layer built from it.
///
/// ```rust,no_run
/// use axum::{Router, routing::post};
/// use springwheel::handler::HandlerMethod;
/// use springwheel::interceptor::InterceptorRegistry;
/// use springwheel::validation::ValidationInterceptor;
///
/// # async fn create_widget() {}
/// # fn main() -> springwheel::Result<()> {
/// struct WidgetController;
///
/// let interceptors = InterceptorRegistry::new().add(ValidationInterceptor::default());
/// let create = HandlerMethod::of::<WidgetController>("create").param_check();
///
/// let app: Router = Router::new()
///     .route("/widgets", post(create_widget).layer(interceptors.layer(create)?));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct InterceptorRegistry {
    interceptors: Vec<Arc<dyn HandlerInterceptor>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, interceptor: impl HandlerInterceptor) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn add_shared(mut self, interceptor: Arc<dyn HandlerInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Build the route layer for `handler`, giving every interceptor the chance to
    /// reject the registration.
    pub fn layer(&self, handler: HandlerMethod) -> Result<InterceptorLayer, WheelError> {
        for interceptor in &self.interceptors {
            interceptor.on_register(&handler)?;
        }
        Ok(InterceptorLayer::new(
            Arc::new(self.interceptors.clone()),
            Arc::new(handler),
        ))
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}
