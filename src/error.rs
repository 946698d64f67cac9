use crate::exception::{ApiException, EscapedError, HttpExceptionFilter, ParamCheckException};
use crate::resolver::ResolveError;
use thiserror::Error;

pub type Result<T, E = WheelError> = std::result::Result<T, E>;

/// Every failure that can escape a handler or a handler interceptor.
///
/// Handlers return `Result<_, WheelError>`; anything that is not a domain error is
/// carried as [`WheelError::Internal`] and never echoed to the caller.
#[derive(Debug, Error)]
pub enum WheelError {
    /// Intentionally raised by business logic with an explicit classification.
    #[error(transparent)]
    Api(#[from] ApiException),

    /// Raised by the validation interceptor when constraints fail.
    #[error(transparent)]
    ParamCheck(#[from] ParamCheckException),

    /// The request could not be turned into handler arguments.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Deployment or programming defect, e.g. a parameter no resolver supports.
    #[error("Configuration fault: {0}")]
    Configuration(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WheelError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether the error carries an application-defined classification.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            WheelError::Api(_) | WheelError::ParamCheck(_) | WheelError::Resolve(_)
        )
    }
}

impl axum::response::IntoResponse for WheelError {
    fn into_response(self) -> axum::response::Response {
        // Rendered without request context; the exception layer re-renders it with
        // context and emits the log record.
        let (result, status) = HttpExceptionFilter::translate(&self);
        let mut response = result.into_response_with(status);
        response.extensions_mut().insert(EscapedError::new(self));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::ErrorCode;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_into_response_marks_escaped_error() {
        let error: WheelError = ApiException::new(ErrorCode::NOT_FOUND, "widget 9 not found").into();
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let escaped = response.extensions().get::<EscapedError>().unwrap();
        assert_eq!(escaped.error().to_string(), "widget 9 not found");
    }

    #[test]
    fn test_result_alias_takes_explicit_error() {
        fn parse(raw: &str) -> Result<u16, std::num::ParseIntError> {
            raw.parse()
        }
        fn lookup(raw: &str) -> Result<u16> {
            parse(raw).map_err(|e| WheelError::Internal(e.into()))
        }

        assert_eq!(lookup("404").unwrap(), 404);
        assert!(matches!(lookup("four"), Err(WheelError::Internal(_))));
    }

    #[test]
    fn test_classification() {
        assert!(WheelError::from(ParamCheckException::new("name: must not be blank")).is_classified());
        assert!(!WheelError::from(anyhow::anyhow!("disk full")).is_classified());
        assert!(!WheelError::configuration("no resolver").is_classified());
    }
}
