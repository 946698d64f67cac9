use crate::binder::InitBinderRegistry;
use crate::config::WebConfig;
use crate::error::WheelError;
use crate::exception::ParamCheckException;
use crate::handler::{ArgumentValue, HandlerMethod, ResolvedArguments};
use crate::interceptor::HandlerInterceptor;
use crate::resolver::{ResolveError, ResolverRegistry, WebRequest};
use crate::validation::{ValidationResult, collect_violations};
use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequestParts, RawPathParams},
    http::{Request, request::Parts},
};

/// Validates the arguments of handlers marked with `param_check` before they run.
///
/// For a marked handler it resolves every declared parameter from the request, then
/// runs two passes: object-graph validation of each resolved value, then the
/// method-level constraints of each parameter. Any violation rejects the request
/// with a [`ParamCheckException`]. Unmarked handlers pass straight through.
pub struct ValidationInterceptor {
    resolvers: ResolverRegistry,
    binders: InitBinderRegistry,
    max_body_bytes: usize,
}

impl ValidationInterceptor {
    pub fn new(resolvers: ResolverRegistry, binders: InitBinderRegistry) -> Self {
        Self {
            resolvers,
            binders,
            max_body_bytes: WebConfig::default().max_body_bytes,
        }
    }

    pub fn from_config(
        resolvers: ResolverRegistry,
        binders: InitBinderRegistry,
        config: &WebConfig,
    ) -> Self {
        Self {
            max_body_bytes: config.max_body_bytes,
            ..Self::new(resolvers, binders)
        }
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    pub fn binders(&self) -> &InitBinderRegistry {
        &self.binders
    }

    /// Resolve every declared parameter in declaration order.
    ///
    /// A parameter no resolver supports is a configuration fault.
    pub fn resolve_arguments(
        &self,
        handler: &HandlerMethod,
        request: &WebRequest<'_>,
    ) -> Result<Vec<Option<ArgumentValue>>, WheelError> {
        let binder_factory = self.binders.binder_factory(handler);

        handler
            .parameters()
            .iter()
            .map(|parameter| -> Result<Option<ArgumentValue>, WheelError> {
                let resolver = self
                    .resolvers
                    .get_argument_resolver(handler, parameter)
                    .ok_or_else(|| unknown_parameter(handler, parameter.index()))?;
                let binder = binder_factory.create_binder(parameter.name());
                Ok(resolver.resolve_argument(parameter, request, &binder)?)
            })
            .collect()
    }

    /// Run both validation passes and merge their violations; the method-level pass
    /// overwrites the object-graph pass on duplicate keys.
    pub fn check_params(
        &self,
        handler: &HandlerMethod,
        arguments: &[Option<ArgumentValue>],
    ) -> ValidationResult {
        let mut result = ValidationResult::new();

        for argument in arguments.iter().flatten() {
            if let Err(errors) = argument.validate() {
                result.merge(ValidationResult::from_violations(collect_violations(&errors)));
            }
        }

        let mut method_result = ValidationResult::new();
        for (parameter, argument) in handler.parameters().iter().zip(arguments) {
            for constraint in parameter.constraints() {
                if let Some(message) = constraint.check(argument.as_ref()) {
                    method_result.record(parameter.name(), message);
                }
            }
        }
        result.merge(method_result);

        result
    }

    async fn buffer_body(&self, body: Body) -> Result<Bytes, ResolveError> {
        axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| ResolveError::UnreadableBody(e.to_string()))
    }
}

impl Default for ValidationInterceptor {
    fn default() -> Self {
        Self::new(ResolverRegistry::with_defaults(), InitBinderRegistry::new())
    }
}

#[async_trait]
impl HandlerInterceptor for ValidationInterceptor {
    /// Fail fast on parameters no resolver supports, priming the resolver cache.
    fn on_register(&self, handler: &HandlerMethod) -> Result<(), WheelError> {
        if !handler.requires_validation() {
            return Ok(());
        }
        for parameter in handler.parameters() {
            if self.resolvers.get_argument_resolver(handler, parameter).is_none() {
                return Err(unknown_parameter(handler, parameter.index()));
            }
        }
        Ok(())
    }

    async fn pre_handle(
        &self,
        request: Request<Body>,
        handler: &HandlerMethod,
    ) -> Result<Request<Body>, WheelError> {
        if !handler.requires_validation() {
            return Ok(request);
        }

        let (mut parts, body) = request.into_parts();
        let body = self.buffer_body(body).await?;
        let path_params = path_params(&mut parts).await;

        let arguments = {
            let web_request = WebRequest::new(&parts, &body, &path_params);
            self.resolve_arguments(handler, &web_request)?
        };

        let result = self.check_params(handler, &arguments);
        if result.has_errors() {
            tracing::debug!("Parameter check failed for {}: {}", handler, result);
            return Err(ParamCheckException::new(result.to_string()).into());
        }

        let names = handler
            .parameters()
            .iter()
            .map(|parameter| parameter.name().to_string())
            .collect();
        parts
            .extensions
            .insert(ResolvedArguments::new(names, arguments));
        Ok(Request::from_parts(parts, Body::from(body)))
    }
}

fn unknown_parameter(handler: &HandlerMethod, index: usize) -> WheelError {
    match handler.parameters().get(index) {
        Some(parameter) => WheelError::configuration(format!(
            "No argument resolver for {} '{}' of type [{}] in {}",
            parameter.kind(),
            parameter.name(),
            parameter.parameter_type().type_name(),
            handler
        )),
        None => WheelError::configuration(format!("{} has no parameter {}", handler, index)),
    }
}

async fn path_params(parts: &mut Parts) -> Vec<(String, String)> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{MethodParameter, ParameterKind, ParameterType};
    use crate::validation::ParameterConstraint;
    use serde::Deserialize;
    use validator::Validate;

    struct WidgetController;

    #[derive(Debug, Deserialize, Validate)]
    struct NewWidget {
        #[validate(length(min = 1, message = "must not be blank"))]
        name: String,
        #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
        quantity: u32,
    }

    fn parts(uri: &str) -> Parts {
        Request::builder().uri(uri).body(()).unwrap().into_parts().0
    }

    fn create_handler() -> HandlerMethod {
        HandlerMethod::of::<WidgetController>("create")
            .param(MethodParameter::body::<NewWidget>("widget"))
            .param(
                MethodParameter::query::<String>("name")
                    .optional()
                    .constraint(ParameterConstraint::length(3, 10)),
            )
            .param_check()
    }

    fn resolve(
        interceptor: &ValidationInterceptor,
        handler: &HandlerMethod,
        uri: &str,
        body: &'static str,
    ) -> Vec<Option<ArgumentValue>> {
        let parts = parts(uri);
        let body = Bytes::from_static(body.as_bytes());
        let request = WebRequest::new(&parts, &body, &[]);
        interceptor.resolve_arguments(handler, &request).unwrap()
    }

    #[test]
    fn test_both_passes_merge_last_writer_wins() {
        let interceptor = ValidationInterceptor::default();
        let handler = create_handler();
        let arguments = resolve(
            &interceptor,
            &handler,
            "/widgets?name=ab",
            r#"{"name":"","quantity":0}"#,
        );

        let result = interceptor.check_params(&handler, &arguments);
        assert!(result.has_errors());
        assert_eq!(result.error_msg()["name"], "length must be between 3 and 10");
        assert_eq!(result.error_msg()["quantity"], "must be between 1 and 100");
    }

    #[test]
    fn test_merge_is_repeatable() {
        let interceptor = ValidationInterceptor::default();
        let handler = create_handler();
        let arguments = resolve(&interceptor, &handler, "/widgets?name=ab", r#"{"name":"","quantity":0}"#);

        let first = interceptor.check_params(&handler, &arguments);
        let second = interceptor.check_params(&handler, &arguments);
        assert_eq!(first, second);
    }

    #[test]
    fn test_valid_arguments_pass() {
        let interceptor = ValidationInterceptor::default();
        let handler = create_handler();
        let arguments = resolve(&interceptor, &handler, "/widgets", r#"{"name":"sprocket","quantity":3}"#);

        assert!(arguments[1].is_none());
        assert!(!interceptor.check_params(&handler, &arguments).has_errors());
    }

    #[test]
    fn test_unknown_parameter_is_configuration_fault() {
        let interceptor = ValidationInterceptor::default();
        let handler = HandlerMethod::of::<WidgetController>("list")
            .param(MethodParameter::new("tenant", ParameterKind::Custom, ParameterType::text::<String>()))
            .param_check();

        let err = interceptor.on_register(&handler).unwrap_err();
        assert!(matches!(err, WheelError::Configuration(ref m) if m.contains("'tenant'")));

        let parts = parts("/widgets");
        let body = Bytes::new();
        let request = WebRequest::new(&parts, &body, &[]);
        assert!(matches!(
            interceptor.resolve_arguments(&handler, &request),
            Err(WheelError::Configuration(_))
        ));
    }

    #[test]
    fn test_unmarked_handler_registers_without_checks() {
        let interceptor = ValidationInterceptor::default();
        let handler = HandlerMethod::of::<WidgetController>("list")
            .param(MethodParameter::new("tenant", ParameterKind::Custom, ParameterType::text::<String>()));

        assert!(interceptor.on_register(&handler).is_ok());
        assert_eq!(interceptor.resolvers().cached_parameters(), 0);
    }

    #[test]
    fn test_registration_primes_caches() {
        let interceptor = ValidationInterceptor::default();
        let handler = create_handler();

        interceptor.on_register(&handler).unwrap();
        assert_eq!(interceptor.resolvers().cached_parameters(), 2);

        resolve(&interceptor, &handler, "/widgets", r#"{"name":"sprocket","quantity":3}"#);
        resolve(&interceptor, &handler, "/widgets", r#"{"name":"gear","quantity":4}"#);
        assert_eq!(interceptor.resolvers().cached_parameters(), 2);
        assert_eq!(interceptor.binders().cached_selections(), 1);
    }

    #[tokio::test]
    async fn test_pre_handle_passes_unmarked_handler_untouched() {
        let interceptor = ValidationInterceptor::default();
        let handler = HandlerMethod::of::<WidgetController>("list");
        let request = Request::builder().uri("/widgets").body(Body::from("raw")).unwrap();

        let request = interceptor.pre_handle(request, &handler).await.unwrap();
        assert!(request.extensions().get::<ResolvedArguments>().is_none());
    }

    #[tokio::test]
    async fn test_pre_handle_rejects_and_accepts() {
        let interceptor = ValidationInterceptor::default();
        let handler = create_handler();

        let bad = Request::builder()
            .uri("/widgets")
            .body(Body::from(r#"{"name":"","quantity":5}"#))
            .unwrap();
        let err = interceptor.pre_handle(bad, &handler).await.unwrap_err();
        assert_eq!(err.to_string(), "name: must not be blank");

        let good = Request::builder()
            .uri("/widgets")
            .body(Body::from(r#"{"name":"sprocket","quantity":5}"#))
            .unwrap();
        let request = interceptor.pre_handle(good, &handler).await.unwrap();
        let arguments = request.extensions().get::<ResolvedArguments>().unwrap();
        assert_eq!(arguments.get::<NewWidget>("widget").unwrap().name, "sprocket");

        let bytes = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], br#"{"name":"sprocket","quantity":5}"#);
    }

    #[tokio::test]
    async fn test_unregistered_unresolvable_handler_answers_500() {
        use axum::http::StatusCode;
        use axum::response::IntoResponse;

        let interceptor = ValidationInterceptor::default();
        let handler = HandlerMethod::of::<WidgetController>("list")
            .param(MethodParameter::new("tenant", ParameterKind::Custom, ParameterType::text::<String>()))
            .param_check();
        let request = Request::builder().uri("/widgets").body(Body::empty()).unwrap();

        let err = interceptor.pre_handle(request, &handler).await.unwrap_err();
        assert!(matches!(err, WheelError::Configuration(_)));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_oversized_body_is_unreadable() {
        let config = WebConfig {
            max_body_bytes: 8,
            ..WebConfig::default()
        };
        let interceptor =
            ValidationInterceptor::from_config(ResolverRegistry::with_defaults(), InitBinderRegistry::new(), &config);
        let request = Request::builder()
            .uri("/widgets")
            .body(Body::from(r#"{"name":"sprocket","quantity":5}"#))
            .unwrap();

        let err = interceptor.pre_handle(request, &create_handler()).await.unwrap_err();
        assert!(matches!(err, WheelError::Resolve(ResolveError::UnreadableBody(_))));
    }
}
