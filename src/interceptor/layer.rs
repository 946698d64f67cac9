use crate::handler::HandlerMethod;
use crate::interceptor::{HandlerInterceptor, RequestHead};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower Layer running a chain of [`HandlerInterceptor`]s around one handler
///
/// Built by [`InterceptorRegistry::layer`](crate::interceptor::InterceptorRegistry::layer)
/// and applied to a single route with `MethodRouter::layer`.
#[derive(Clone)]
pub struct InterceptorLayer {
    interceptors: Arc<Vec<Arc<dyn HandlerInterceptor>>>,
    handler: Arc<HandlerMethod>,
}

impl InterceptorLayer {
    pub(crate) fn new(
        interceptors: Arc<Vec<Arc<dyn HandlerInterceptor>>>,
        handler: Arc<HandlerMethod>,
    ) -> Self {
        Self {
            interceptors,
            handler,
        }
    }

    pub fn handler(&self) -> &HandlerMethod {
        &self.handler
    }
}

impl<S> Layer<S> for InterceptorLayer {
    type Service = InterceptorMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        InterceptorMiddleware {
            inner,
            interceptors: self.interceptors.clone(),
            handler: self.handler.clone(),
        }
    }
}

#[derive(Clone)]
pub struct InterceptorMiddleware<S> {
    inner: S,
    interceptors: Arc<Vec<Arc<dyn HandlerInterceptor>>>,
    handler: Arc<HandlerMethod>,
}

impl<S> Service<Request<Body>> for InterceptorMiddleware<S>
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
        let interceptors = self.interceptors.clone();
        let handler = self.handler.clone();

        // The clone has not been polled for readiness; keep the ready one for this call.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let head = RequestHead::from_request(&request);
            let mut request = request;

            for (applied, interceptor) in interceptors.iter().enumerate() {
                match interceptor.pre_handle(request, &handler).await {
                    Ok(next) => request = next,
                    Err(error) => {
                        tracing::debug!("{} rejected before invocation: {}", handler, error);
                        let response = error.into_response();
                        trigger_after_completion(
                            &interceptors[..applied],
                            &head,
                            response.status(),
                            &handler,
                        )
                        .await;
                        return Ok(response);
                    }
                }
            }

            let mut response = inner.call(request).await?;

            for interceptor in interceptors.iter().rev() {
                if let Err(error) = interceptor.post_handle(&mut response, &handler).await {
                    response = error.into_response();
                    break;
                }
            }

            trigger_after_completion(&interceptors, &head, response.status(), &handler).await;
            Ok(response)
        })
    }
}

async fn trigger_after_completion(
    interceptors: &[Arc<dyn HandlerInterceptor>],
    head: &RequestHead,
    status: StatusCode,
    handler: &HandlerMethod,
) {
    for interceptor in interceptors.iter().rev() {
        interceptor.after_completion(head, status, handler).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WheelError;
    use crate::exception::{ApiException, ErrorCode};
    use crate::interceptor::InterceptorRegistry;
    use async_trait::async_trait;
    use axum::{Router, routing::get};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct Recording {
        id: &'static str,
        reject: bool,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Recording {
        fn push(&self, event: &str) {
            self.events.lock().unwrap().push(format!("{}:{}", self.id, event));
        }
    }

    #[async_trait]
    impl HandlerInterceptor for Recording {
        async fn pre_handle(
            &self,
            request: Request<Body>,
            _handler: &HandlerMethod,
        ) -> Result<Request<Body>, WheelError> {
            self.push("pre");
            if self.reject {
                return Err(ApiException::new(ErrorCode::FORBIDDEN, "denied").into());
            }
            Ok(request)
        }

        async fn post_handle(
            &self,
            _response: &mut Response,
            _handler: &HandlerMethod,
        ) -> Result<(), WheelError> {
            self.push("post");
            Ok(())
        }

        async fn after_completion(
            &self,
            _head: &RequestHead,
            status: StatusCode,
            _handler: &HandlerMethod,
        ) {
            self.push(&format!("done {}", status.as_u16()));
        }
    }

    struct Controller;

    /// Only answers on the instance that was polled ready; clones start unready.
    #[derive(Default)]
    struct ReadyOnce {
        ready: bool,
    }

    impl Clone for ReadyOnce {
        fn clone(&self) -> Self {
            Self::default()
        }
    }

    impl Service<Request<Body>> for ReadyOnce {
        type Response = Response;
        type Error = Infallible;
        type Future = std::future::Ready<Result<Response, Infallible>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Infallible>> {
            self.ready = true;
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _request: Request<Body>) -> Self::Future {
            let status = if self.ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
            self.ready = false;
            std::future::ready(Ok(Response::builder()
                .status(status)
                .body(Body::empty())
                .unwrap()))
        }
    }

    fn app(reject_second: bool, events: &Arc<Mutex<Vec<String>>>) -> Router {
        let registry = InterceptorRegistry::new()
            .add(Recording { id: "a", reject: false, events: events.clone() })
            .add(Recording { id: "b", reject: reject_second, events: events.clone() })
            .add(Recording { id: "c", reject: false, events: events.clone() });
        let handler_events = events.clone();
        let layer = registry.layer(HandlerMethod::of::<Controller>("ping")).unwrap();

        Router::new().route(
            "/ping",
            get(move || async move {
                handler_events.lock().unwrap().push("handler".to_string());
                "pong"
            })
            .layer(layer),
        )
    }

    fn request() -> Request<Body> {
        Request::builder().uri("/ping").body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_hook_order_on_success() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let response = app(false, &events).oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "a:pre", "b:pre", "c:pre", "handler", "c:post", "b:post", "a:post",
                "c:done 200", "b:done 200", "a:done 200",
            ]
        );
    }

    #[tokio::test]
    async fn test_calls_the_service_polled_ready() {
        let layer = InterceptorRegistry::new()
            .layer(HandlerMethod::of::<Controller>("ping"))
            .unwrap();
        let mut service = layer.layer(ReadyOnce::default());

        let response = service.ready().await.unwrap().call(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_rejection_skips_handler() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let response = app(true, &events).oneshot(request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(*events.lock().unwrap(), vec!["a:pre", "b:pre", "a:done 403"]);
    }
}
