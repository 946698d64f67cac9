use crate::binder::DataBinder;
use crate::handler::{ArgumentValue, Decoder, MethodParameter, ParameterKind};
use crate::resolver::{ArgumentResolver, ResolveError, WebRequest};

/// Resolves `{name}` segments of the matched route.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathVariableResolver;

impl ArgumentResolver for PathVariableResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.kind() == ParameterKind::PathVariable && parameter.parameter_type().is_text()
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        request: &WebRequest<'_>,
        binder: &DataBinder,
    ) -> Result<Option<ArgumentValue>, ResolveError> {
        resolve_text(parameter, request.path_variable(parameter.name()), binder)
    }
}

/// Resolves query string parameters.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestParamResolver;

impl ArgumentResolver for RequestParamResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.kind() == ParameterKind::RequestParam && parameter.parameter_type().is_text()
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        request: &WebRequest<'_>,
        binder: &DataBinder,
    ) -> Result<Option<ArgumentValue>, ResolveError> {
        resolve_text(parameter, request.query_param(parameter.name()), binder)
    }
}

/// Resolves request headers by case-insensitive name.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestHeaderResolver;

impl ArgumentResolver for RequestHeaderResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.kind() == ParameterKind::RequestHeader && parameter.parameter_type().is_text()
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        request: &WebRequest<'_>,
        binder: &DataBinder,
    ) -> Result<Option<ArgumentValue>, ResolveError> {
        resolve_text(parameter, request.header(parameter.name()), binder)
    }
}

/// Decodes the JSON request body.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestBodyResolver;

impl ArgumentResolver for RequestBodyResolver {
    fn supports_parameter(&self, parameter: &MethodParameter) -> bool {
        parameter.kind() == ParameterKind::RequestBody && parameter.parameter_type().is_json()
    }

    fn resolve_argument(
        &self,
        parameter: &MethodParameter,
        request: &WebRequest<'_>,
        binder: &DataBinder,
    ) -> Result<Option<ArgumentValue>, ResolveError> {
        let body = request.body();
        if body.iter().all(u8::is_ascii_whitespace) {
            return absent(parameter);
        }

        let mut raw: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| ResolveError::UnreadableBody(e.to_string()))?;
        binder.bind_json(&mut raw);

        match parameter.parameter_type().decoder {
            Decoder::Json(decode) => decode(raw)
                .map(Some)
                .map_err(ResolveError::UnreadableBody),
            Decoder::Text(_) => Err(ResolveError::UnreadableBody(format!(
                "'{}' is not a JSON type",
                parameter.parameter_type().type_name()
            ))),
        }
    }
}

fn resolve_text(
    parameter: &MethodParameter,
    raw: Option<&str>,
    binder: &DataBinder,
) -> Result<Option<ArgumentValue>, ResolveError> {
    let Some(text) = raw.and_then(|raw| binder.bind_text(raw)) else {
        return absent(parameter);
    };

    match parameter.parameter_type().decoder {
        Decoder::Text(decode) => decode(&text).map(Some).map_err(|reason| {
            ResolveError::TypeMismatch {
                kind: parameter.kind(),
                name: parameter.name().to_string(),
                type_name: parameter.parameter_type().type_name(),
                reason,
            }
        }),
        Decoder::Json(_) => Err(ResolveError::TypeMismatch {
            kind: parameter.kind(),
            name: parameter.name().to_string(),
            type_name: parameter.parameter_type().type_name(),
            reason: "not a textual type".to_string(),
        }),
    }
}

fn absent(parameter: &MethodParameter) -> Result<Option<ArgumentValue>, ResolveError> {
    if parameter.is_required() {
        Err(ResolveError::MissingParameter {
            kind: parameter.kind(),
            name: parameter.name().to_string(),
        })
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{Request, request::Parts};
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct NewWidget {
        name: String,
        #[serde(default)]
        id: Option<u64>,
    }

    fn parts(uri: &str) -> Parts {
        Request::builder()
            .uri(uri)
            .header("x-tenant", "  acme ")
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn test_path_variable() {
        let parts = parts("/widgets/9");
        let body = Bytes::new();
        let params = vec![("id".to_string(), "9".to_string())];
        let request = WebRequest::new(&parts, &body, &params);

        let id = MethodParameter::path::<u64>("id");
        let value = PathVariableResolver
            .resolve_argument(&id, &request, &DataBinder::new())
            .unwrap()
            .unwrap();
        assert_eq!(value.downcast_ref::<u64>(), Some(&9));
    }

    #[test]
    fn test_request_param_missing_and_optional() {
        let parts = parts("/widgets?limit=ten");
        let body = Bytes::new();
        let request = WebRequest::new(&parts, &body, &[]);
        let binder = DataBinder::new();

        let q = MethodParameter::query::<String>("q");
        let err = RequestParamResolver.resolve_argument(&q, &request, &binder).unwrap_err();
        assert_eq!(err.to_string(), "Required request parameter 'q' is not present");

        let q = MethodParameter::query::<String>("q").optional();
        assert!(RequestParamResolver.resolve_argument(&q, &request, &binder).unwrap().is_none());

        let limit = MethodParameter::query::<u32>("limit");
        let err = RequestParamResolver.resolve_argument(&limit, &request, &binder).unwrap_err();
        assert!(matches!(err, ResolveError::TypeMismatch { ref name, .. } if name == "limit"));
    }

    #[test]
    fn test_header_goes_through_binder() {
        let parts = parts("/widgets");
        let body = Bytes::new();
        let request = WebRequest::new(&parts, &body, &[]);
        let mut binder = DataBinder::new();
        binder.trim_strings(true);

        let tenant = MethodParameter::header::<String>("X-Tenant");
        assert!(RequestHeaderResolver.supports_parameter(&tenant));
        let value = RequestHeaderResolver
            .resolve_argument(&tenant, &request, &binder)
            .unwrap()
            .unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "acme");
    }

    #[test]
    fn test_body_decoding_and_disallowed_fields() {
        let parts = parts("/widgets");
        let body = Bytes::from_static(br#"{"name":"sprocket","id":7}"#);
        let request = WebRequest::new(&parts, &body, &[]);
        let mut binder = DataBinder::new();
        binder.set_disallowed_fields(["id"]);

        let widget = MethodParameter::body::<NewWidget>("widget");
        let value = RequestBodyResolver
            .resolve_argument(&widget, &request, &binder)
            .unwrap()
            .unwrap();
        let widget = value.downcast_ref::<NewWidget>().unwrap();
        assert_eq!(widget.name, "sprocket");
        assert_eq!(widget.id, None);
    }

    #[test]
    fn test_body_errors() {
        let parts = parts("/widgets");
        let widget = MethodParameter::body::<NewWidget>("widget");

        let empty = Bytes::from_static(b"  ");
        let request = WebRequest::new(&parts, &empty, &[]);
        let err = RequestBodyResolver
            .resolve_argument(&widget, &request, &DataBinder::new())
            .unwrap_err();
        assert!(matches!(err, ResolveError::MissingParameter { .. }));

        let malformed = Bytes::from_static(b"{\"name\":");
        let request = WebRequest::new(&parts, &malformed, &[]);
        let err = RequestBodyResolver
            .resolve_argument(&widget, &request, &DataBinder::new())
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnreadableBody(_)));
    }

    #[test]
    fn test_supports_by_kind() {
        let body = MethodParameter::body::<NewWidget>("widget");
        let id = MethodParameter::path::<u64>("id");
        assert!(RequestBodyResolver.supports_parameter(&body));
        assert!(!RequestBodyResolver.supports_parameter(&id));
        assert!(PathVariableResolver.supports_parameter(&id));
        assert!(!RequestParamResolver.supports_parameter(&id));
    }
}
