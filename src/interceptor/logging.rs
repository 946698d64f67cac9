use crate::error::WheelError;
use crate::handler::HandlerMethod;
use crate::interceptor::{HandlerInterceptor, RequestHead};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};

/// An interceptor that logs request timing and status
#[derive(Clone, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl HandlerInterceptor for LoggingInterceptor {
    async fn pre_handle(
        &self,
        request: Request<Body>,
        handler: &HandlerMethod,
    ) -> Result<Request<Body>, WheelError> {
        tracing::info!("--> {} {} ({})", request.method(), request.uri(), handler);
        Ok(request)
    }

    async fn after_completion(&self, head: &RequestHead, status: StatusCode, _handler: &HandlerMethod) {
        let duration = head.started.elapsed();
        tracing::info!(
            "<-- {} {} {} {:?}",
            head.method,
            head.uri,
            status,
            duration
        );
    }
}
